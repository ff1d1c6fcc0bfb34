mod rk_order;
mod saturation;
