pub mod binning;
pub mod extent;
pub mod range;
pub mod scan;
pub mod split;
pub mod table;
