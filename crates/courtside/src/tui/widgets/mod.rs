// TUI widget modules for each screen zone.

pub mod badge;
pub mod match_list;
pub mod quit_confirm;
pub mod status_bar;
