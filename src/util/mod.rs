mod region;

pub(crate) use region::Region;
