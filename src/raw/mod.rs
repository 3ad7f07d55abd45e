mod bitmap;
mod density;
mod raw_pma;
mod store;

pub(crate) use density::{
    INITIAL_CAPACITY, LEAF_LOWER_DENSITY, LEAF_UPPER_DENSITY, ROOT_LOWER_DENSITY, ROOT_UPPER_DENSITY, SCALE_FACTOR,
};
pub(crate) use raw_pma::RawPma;
