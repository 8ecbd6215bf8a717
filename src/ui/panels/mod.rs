pub mod left_panel;
pub mod main_panel;
pub mod right_panel;

pub use left_panel::LeftPanel;
pub use main_panel::MainPanel;
pub use right_panel::RightPanel;
