// FIPS codes for the 50 states plus DC. Territories are deliberately absent:
// the table doubles as the allow-list for boundary features.

pub struct UsState {
    pub fips: u32,
    pub name: &'static str,
}

pub const US_STATES: &[UsState] = &[
    UsState { fips: 1, name: "Alabama" },
    UsState { fips: 2, name: "Alaska" },
    UsState { fips: 4, name: "Arizona" },
    UsState { fips: 5, name: "Arkansas" },
    UsState { fips: 6, name: "California" },
    UsState { fips: 8, name: "Colorado" },
    UsState { fips: 9, name: "Connecticut" },
    UsState { fips: 10, name: "Delaware" },
    UsState { fips: 11, name: "District of Columbia" },
    UsState { fips: 12, name: "Florida" },
    UsState { fips: 13, name: "Georgia" },
    UsState { fips: 15, name: "Hawaii" },
    UsState { fips: 16, name: "Idaho" },
    UsState { fips: 17, name: "Illinois" },
    UsState { fips: 18, name: "Indiana" },
    UsState { fips: 19, name: "Iowa" },
    UsState { fips: 20, name: "Kansas" },
    UsState { fips: 21, name: "Kentucky" },
    UsState { fips: 22, name: "Louisiana" },
    UsState { fips: 23, name: "Maine" },
    UsState { fips: 24, name: "Maryland" },
    UsState { fips: 25, name: "Massachusetts" },
    UsState { fips: 26, name: "Michigan" },
    UsState { fips: 27, name: "Minnesota" },
    UsState { fips: 28, name: "Mississippi" },
    UsState { fips: 29, name: "Missouri" },
    UsState { fips: 30, name: "Montana" },
    UsState { fips: 31, name: "Nebraska" },
    UsState { fips: 32, name: "Nevada" },
    UsState { fips: 33, name: "New Hampshire" },
    UsState { fips: 34, name: "New Jersey" },
    UsState { fips: 35, name: "New Mexico" },
    UsState { fips: 36, name: "New York" },
    UsState { fips: 37, name: "North Carolina" },
    UsState { fips: 38, name: "North Dakota" },
    UsState { fips: 39, name: "Ohio" },
    UsState { fips: 40, name: "Oklahoma" },
    UsState { fips: 41, name: "Oregon" },
    UsState { fips: 42, name: "Pennsylvania" },
    UsState { fips: 44, name: "Rhode Island" },
    UsState { fips: 45, name: "South Carolina" },
    UsState { fips: 46, name: "South Dakota" },
    UsState { fips: 47, name: "Tennessee" },
    UsState { fips: 48, name: "Texas" },
    UsState { fips: 49, name: "Utah" },
    UsState { fips: 50, name: "Vermont" },
    UsState { fips: 51, name: "Virginia" },
    UsState { fips: 53, name: "Washington" },
    UsState { fips: 54, name: "West Virginia" },
    UsState { fips: 55, name: "Wisconsin" },
    UsState { fips: 56, name: "Wyoming" },
];

pub fn state_name(fips: u32) -> Option<&'static str> {
    US_STATES.iter().find(|s| s.fips == fips).map(|s| s.name)
}

/// Parses a feature id such as `"01"` or `6` into a FIPS code.
pub fn parse_fips(id: &str) -> Option<u32> {
    id.trim().parse().ok()
}

/// Two-digit, zero-padded form used in log context.
pub fn padded(fips: u32) -> String {
    format!("{:02}", fips)
}
