/// Status string the firmware reports for a soil reading above the dry limit
pub const TOO_DRY: &str = "Muito Seco";
/// Status string the firmware reports for a soil reading below the wet limit
pub const TOO_WET: &str = "Muito Úmido";

/// Presentation class of a sensor card
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusClass {
    Danger,
    Secondary,
    #[default]
    Primary,
}

impl StatusClass {
    pub fn from_status(status: Option<&str>) -> Self {
        match status {
            Some(TOO_DRY) => StatusClass::Danger,
            Some(TOO_WET) => StatusClass::Secondary,
            _ => StatusClass::Primary,
        }
    }
}
