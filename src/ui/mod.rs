// UI module - Slint window wiring
//
// GuiController connects the MainWindow callbacks to the import/export services and
// mirrors StateManager events back into the window.

pub mod controller;

pub use controller::GuiController;
