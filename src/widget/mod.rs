//! UI widgets

pub mod help_popup;
pub mod hud_message;
pub mod install_banner;
pub mod page_view;
pub mod search_overlay;
pub mod side_panel;
pub mod toolbar;
pub mod translate_overlay;

pub use help_popup::{HelpPopup, HelpPopupAction};
pub use hud_message::{HudMessage, HudMode};
pub use install_banner::InstallBanner;
pub use page_view::PageView;
pub use search_overlay::{SearchOverlay, SearchOverlayAction};
pub use side_panel::{PanelAction, PanelContext, PanelTab, SidePanel};
pub use toolbar::{GotoAction, Toolbar, ToolbarStatus};
pub use translate_overlay::{TranslateOverlay, TranslateOverlayAction};
