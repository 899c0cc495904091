domain_enum! {
    /// Binary survey answer
    pub enum YesNo as "YesNo" {
        Yes => "yes",
        No => "no",
    }
}

impl YesNo {
    pub fn to_bool(self) -> bool {
        self == YesNo::Yes
    }

    pub fn from_bool(value: bool) -> Self {
        if value {
            YesNo::Yes
        } else {
            YesNo::No
        }
    }
}
