domain_enum! {
    /// Biological sex as recorded in the training survey
    pub enum Gender as "Gender" {
        Male => "Male",
        Female => "Female",
    }
}
