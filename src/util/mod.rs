mod descriptor;
mod descriptor_table;
mod meta_data;
mod seek_flag;
mod storage_path;

pub use self::descriptor::Descriptor;
pub(crate) use self::descriptor_table::DescriptorTable;
pub(crate) use self::meta_data::{Availability, MetaData};
pub use self::seek_flag::SeekFlag;
pub use self::storage_path::StoragePath;
