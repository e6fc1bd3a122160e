// constants module
pub mod constants;

// geometry module
pub mod geometry {
    pub mod vector;
    pub mod axis;
}

// jet module
pub mod jet {
    pub mod pseudo_jet;
    pub mod area;
    pub mod cluster;
    pub mod background;
}

// histogram module
pub mod histogram {
    pub mod axis;
    pub mod hist;
    pub mod registry;
}
