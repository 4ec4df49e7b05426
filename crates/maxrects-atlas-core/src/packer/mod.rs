pub mod maxrects;

pub use maxrects::MaxRectsBinPack;
