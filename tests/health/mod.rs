mod prognostics;
