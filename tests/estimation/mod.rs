mod consistency;
mod fault_injection;
