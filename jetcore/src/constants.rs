// Purpose: To store constants that are used in the program
pub const MASS_PION_CHARGED: f64 = 0.13957039; // GeV/c^2
pub const MASS_PROTON: f64 = 0.938272088; // GeV/c^2
pub const MASS_DEUTERON: f64 = 1.87561294; // GeV/c^2
pub const MASS_HELIUM3: f64 = 2.80839160; // GeV/c^2

// PDG Monte Carlo numbering scheme
pub const PDG_PROTON: i32 = 2212;
pub const PDG_DEUTERON: i32 = 1000010020;
pub const PDG_HELIUM3: i32 = 1000020030;

// Rapidity assigned to objects with zero transverse momentum
pub const MAX_RAP: f64 = 1e5;
