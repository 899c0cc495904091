domain_enum! {
    /// Usual mode of transportation
    pub enum Transport as "MTRANS" {
        Automobile => "Automobile",
        Motorbike => "Motorbike",
        Bike => "Bike",
        PublicTransportation => "Public_Transportation",
        Walking => "Walking",
    }
}

impl Transport {
    /// Transport that involves physical effort
    pub fn is_active_transport(self) -> bool {
        matches!(self, Transport::Bike | Transport::Walking)
    }

    pub fn is_motorized(self) -> bool {
        matches!(
            self,
            Transport::Automobile | Transport::Motorbike | Transport::PublicTransportation
        )
    }
}
