domain_enum! {
    /// WHO adult BMI bucket
    pub enum BmiCategory as "BmiCategory" {
        Underweight => "Underweight",
        Normal => "Normal",
        Overweight => "Overweight",
        Obese => "Obese",
    }
}

impl BmiCategory {
    /// Buckets are inclusive below and exclusive above; the top one is open.
    pub fn from_bmi(bmi: f64) -> Self {
        if bmi < 18.5 {
            BmiCategory::Underweight
        } else if bmi < 25.0 {
            BmiCategory::Normal
        } else if bmi < 30.0 {
            BmiCategory::Overweight
        } else {
            BmiCategory::Obese
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(BmiCategory::from_bmi(18.499), BmiCategory::Underweight);
        assert_eq!(BmiCategory::from_bmi(18.5), BmiCategory::Normal);
        assert_eq!(BmiCategory::from_bmi(24.999), BmiCategory::Normal);
        assert_eq!(BmiCategory::from_bmi(25.0), BmiCategory::Overweight);
        assert_eq!(BmiCategory::from_bmi(29.999), BmiCategory::Overweight);
        assert_eq!(BmiCategory::from_bmi(30.0), BmiCategory::Obese);
        assert_eq!(BmiCategory::from_bmi(65.0), BmiCategory::Obese);
    }
}
