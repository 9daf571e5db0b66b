pub const FORMAT_NAME: &str = "Truevision TGA";
pub const FILE_EXT: &str = "tga";

pub const HEADER_SIZE: usize = 18;
pub const FOOTER_SIZE: usize = 26;
pub const EXTENSION_AREA_SIZE: usize = 495;

/// "TRUEVISION-XFILE" followed by a period and a NUL terminator.
pub const FOOTER_SIGNATURE: [u8; 18] = *b"TRUEVISION-XFILE.\0";

/// Written into the author-name field of every extension area we encode.
pub const AUTHOR_NAME: &str = "lib-tga";

// Image type bits
pub const RLE_FLAG: u8 = 0x08;
pub const BASE_TYPE_MASK: u8 = 0x07;

// Descriptor bits
pub const ALPHA_DEPTH_MASK: u8 = 0x0f;
pub const RIGHT_ORIGIN_FLAG: u8 = 0x10;
pub const TOP_ORIGIN_FLAG: u8 = 0x20;
