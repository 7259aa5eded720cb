pub mod controls;
pub mod curve_chart;
pub mod debug;
pub mod detail;
pub mod record_table;
pub mod selector;
