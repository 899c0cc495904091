use std::cmp::Ordering;

/// Frequency scale from least to most frequent
pub const FREQUENCY_ORDER: [Frequency; 4] = [
    Frequency::No,
    Frequency::Sometimes,
    Frequency::Frequently,
    Frequency::Always,
];

domain_enum! {
    /// How often something is consumed.
    ///
    /// Used for both CAEC (food between meals) and CALC (alcohol).
    pub enum Frequency as "Frequency" {
        No => "no",
        Sometimes => "Sometimes",
        Frequently => "Frequently",
        Always => "Always",
    }
}

impl Frequency {
    /// Position on the frequency scale, 0 for `no`
    pub fn frequency_level(self) -> usize {
        match self {
            Frequency::No => 0,
            Frequency::Sometimes => 1,
            Frequency::Frequently => 2,
            Frequency::Always => 3,
        }
    }

    pub fn compare(a: Self, b: Self) -> Ordering {
        a.frequency_level().cmp(&b.frequency_level())
    }

    pub fn is_higher_than(self, other: Self) -> bool {
        Self::compare(self, other) == Ordering::Greater
    }

    pub fn is_lower_than(self, other: Self) -> bool {
        Self::compare(self, other) == Ordering::Less
    }
}

impl PartialOrd for Frequency {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frequency {
    fn cmp(&self, other: &Self) -> Ordering {
        Frequency::compare(*self, *other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_order_matches_levels() {
        for (i, f) in FREQUENCY_ORDER.iter().enumerate() {
            assert_eq!(f.frequency_level(), i);
        }
    }

    #[test]
    fn test_frequency_comparison() {
        assert!(Frequency::Always.is_higher_than(Frequency::Frequently));
        assert!(Frequency::No.is_lower_than(Frequency::Sometimes));
        assert!(!Frequency::Sometimes.is_higher_than(Frequency::Sometimes));
        assert_eq!(Frequency::compare(Frequency::Frequently, Frequency::Frequently), Ordering::Equal);
    }

    #[test]
    fn test_order_is_not_alphabetical() {
        // "Always" sorts first alphabetically but is the top of the scale
        assert!(Frequency::Always > Frequency::No);
        let mut values = vec![Frequency::Always, Frequency::No, Frequency::Frequently, Frequency::Sometimes];
        values.sort();
        assert_eq!(values, FREQUENCY_ORDER.to_vec());
    }
}
