// 虚拟滚动与懒加载

pub mod lazy;
pub mod virtual_scroll;

pub use lazy::{Bounds, DEFAULT_ROOT_MARGIN, LazyLoader};
pub use virtual_scroll::{
    BUFFER, PositionedItem, ScrollSurface, VirtualScroll, VisibleRange, visible_count,
    visible_range,
};
