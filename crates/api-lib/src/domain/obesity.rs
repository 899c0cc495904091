use std::cmp::Ordering;

/// Number of classes the model predicts
pub const NUM_CLASSES: usize = 7;

domain_enum! {
    /// Predicted obesity level.
    ///
    /// Declaration order is the label-code order the model was trained to
    /// emit, which is also the severity order.
    pub enum ObesityLevel as "ObesityLevel" {
        InsufficientWeight => "Insufficient_Weight",
        NormalWeight => "Normal_Weight",
        OverweightLevelI => "Overweight_Level_I",
        OverweightLevelII => "Overweight_Level_II",
        ObesityTypeI => "Obesity_Type_I",
        ObesityTypeII => "Obesity_Type_II",
        ObesityTypeIII => "Obesity_Type_III",
    }
}

impl ObesityLevel {
    /// Every level by class code
    pub const ALL: [ObesityLevel; NUM_CLASSES] = [
        ObesityLevel::InsufficientWeight,
        ObesityLevel::NormalWeight,
        ObesityLevel::OverweightLevelI,
        ObesityLevel::OverweightLevelII,
        ObesityLevel::ObesityTypeI,
        ObesityLevel::ObesityTypeII,
        ObesityLevel::ObesityTypeIII,
    ];

    /// Class code emitted by the model for this label
    pub fn code(self) -> u8 {
        match self {
            ObesityLevel::InsufficientWeight => 0,
            ObesityLevel::NormalWeight => 1,
            ObesityLevel::OverweightLevelI => 2,
            ObesityLevel::OverweightLevelII => 3,
            ObesityLevel::ObesityTypeI => 4,
            ObesityLevel::ObesityTypeII => 5,
            ObesityLevel::ObesityTypeIII => 6,
        }
    }

    /// Label for a model class code, `None` outside 0..=6
    pub fn from_code(code: i64) -> Option<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
    }

    /// Levels from least to most severe
    pub fn severity_order() -> [ObesityLevel; NUM_CLASSES] {
        [
            ObesityLevel::InsufficientWeight,
            ObesityLevel::NormalWeight,
            ObesityLevel::OverweightLevelI,
            ObesityLevel::OverweightLevelII,
            ObesityLevel::ObesityTypeI,
            ObesityLevel::ObesityTypeII,
            ObesityLevel::ObesityTypeIII,
        ]
    }

    pub fn severity_level(self) -> usize {
        Self::severity_order()
            .iter()
            .position(|level| *level == self)
            .unwrap_or_default()
    }

    pub fn is_healthy(self) -> bool {
        self == ObesityLevel::NormalWeight
    }

    pub fn is_overweight_or_obese(self) -> bool {
        self.severity_level() > 1
    }

    pub fn is_underweight(self) -> bool {
        self == ObesityLevel::InsufficientWeight
    }
}

impl PartialOrd for ObesityLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ObesityLevel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.severity_level().cmp(&other.severity_level())
    }
}
