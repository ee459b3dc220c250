pub mod app;

pub use app::ChartApp;
