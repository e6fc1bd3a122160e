// data module
pub mod data {
    pub mod track;
    pub mod particle;
    pub mod event;
    pub mod source;
}

// selection module
pub mod selection {
    pub mod filter;
    pub mod pid;
    pub mod systematics;
}

// calibration module
pub mod calib {
    pub mod store;
    pub mod lookup;
}

// analysis module
pub mod analysis {
    pub mod config;
    pub mod ue;
    pub mod jets;
    pub mod histograms;
    pub mod rejection;
    pub mod task;
}

pub mod runner;
