use std::fmt;

use crate::error::AppError;
use crate::timing::ThrottleGate;

/// 可视区域上下各多渲染的条目数
pub const BUFFER: usize = 5;

/// 当前渲染的条目区间，左闭右开
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisibleRange {
    pub start: usize,
    pub end: usize,
}

impl VisibleRange {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.end
    }
}

fn valid_height(height: f64) -> bool {
    height.is_finite() && height > 0.0
}

/// 容器内完整可见的条目数（向上取整）
///
/// 比值溢出时饱和为 `usize::MAX`，调用方需要自行按列表长度截断。
pub fn visible_count(container_height: f64, item_height: f64) -> usize {
    if !valid_height(item_height) || !valid_height(container_height) {
        return 0;
    }
    let ratio = (container_height / item_height).ceil();
    if ratio.is_finite() { ratio as usize } else { usize::MAX }
}

pub fn visible_range(
    scroll_top: f64,
    container_height: f64,
    item_height: f64,
    len: usize,
) -> VisibleRange {
    if len == 0 || !valid_height(item_height) {
        return VisibleRange::default();
    }

    let scroll_top = if scroll_top.is_finite() { scroll_top.max(0.0) } else { 0.0 };
    let first = (scroll_top / item_height).floor() as usize;
    let start = first.saturating_sub(BUFFER).min(len);
    let count = visible_count(container_height, item_height).min(len);
    let end = start.saturating_add(count.saturating_add(2 * BUFFER)).min(len);

    VisibleRange { start, end }
}

/// 已定位的渲染节点
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedItem<N> {
    pub index: usize,
    /// 相对占位元素顶部的绝对偏移
    pub top: f64,
    pub node: N,
}

/// 滚动容器的宿主能力
pub trait ScrollSurface<N> {
    /// 容器固定高度
    fn container_height(&self) -> f64;

    /// 挂载或调整占位元素高度，保持原生滚动条比例
    fn mount_spacer(&mut self, total_height: f64);

    /// 用新的切片替换当前渲染内容
    fn render(&mut self, items: Vec<PositionedItem<N>>);

    /// 移除滚动监听和占位元素
    fn unmount(&mut self);
}

type RenderFn<T, N> = Box<dyn Fn(&T, usize) -> N + Send>;

/// 虚拟滚动列表
///
/// 只渲染可视区域及缓冲区内的条目。构造时挂载占位元素，`destroy` 或 drop
/// 时卸载，且只卸载一次。
pub struct VirtualScroll<T, N, S>
where
    S: ScrollSurface<N>,
{
    surface: S,
    items: Vec<T>,
    item_height: f64,
    render: RenderFn<T, N>,
    gate: ThrottleGate,
    scroll_top: f64,
    range: VisibleRange,
    destroyed: bool,
}

impl<T, N, S> VirtualScroll<T, N, S>
where
    S: ScrollSurface<N>,
{
    pub fn new<R>(
        surface: S,
        items: Vec<T>,
        item_height: f64,
        render: R,
        gate: ThrottleGate,
    ) -> Result<Self, AppError>
    where
        R: Fn(&T, usize) -> N + Send + 'static,
    {
        if !valid_height(item_height) {
            return Err(AppError::InvalidItemHeight(item_height));
        }

        let mut scroll = Self {
            surface,
            items,
            item_height,
            render: Box::new(render),
            gate,
            scroll_top: 0.0,
            range: VisibleRange::default(),
            destroyed: false,
        };
        scroll.surface.mount_spacer(scroll.total_height());
        scroll.render_visible();
        Ok(scroll)
    }

    pub fn total_height(&self) -> f64 {
        self.items.len() as f64 * self.item_height
    }

    pub fn range(&self) -> VisibleRange {
        self.range
    }

    pub fn scroll_top(&self) -> f64 {
        self.scroll_top
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// 滚动事件，按帧节流；返回是否重新渲染
    ///
    /// 被节流丢弃的事件仍会记录位置，滚动停止后由 [`VirtualScroll::refresh`]
    /// 补一次渲染。
    pub fn on_scroll(&mut self, scroll_top: f64) -> bool {
        if self.destroyed {
            return false;
        }
        self.scroll_top = scroll_top.max(0.0);
        if !self.gate.try_acquire() {
            return false;
        }
        self.rerender_if_moved()
    }

    /// 按最近记录的位置渲染，不受节流限制；返回是否重新渲染
    pub fn refresh(&mut self) -> bool {
        if self.destroyed {
            return false;
        }
        self.rerender_if_moved()
    }

    fn rerender_if_moved(&mut self) -> bool {
        let range = visible_range(
            self.scroll_top,
            self.surface.container_height(),
            self.item_height,
            self.items.len(),
        );
        if range == self.range {
            return false;
        }
        self.render_visible();
        true
    }

    /// 替换数据并重新渲染
    pub fn update(&mut self, items: Vec<T>) {
        if self.destroyed {
            return;
        }
        self.items = items;
        self.surface.mount_spacer(self.total_height());
        self.render_visible();
    }

    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.surface.unmount();
        tracing::debug!("Virtual scroll destroyed");
    }

    fn render_visible(&mut self) {
        self.range = visible_range(
            self.scroll_top,
            self.surface.container_height(),
            self.item_height,
            self.items.len(),
        );

        let slice = self.items[self.range.start..self.range.end]
            .iter()
            .enumerate()
            .map(|(offset, item)| {
                let index = self.range.start + offset;
                PositionedItem {
                    index,
                    top: index as f64 * self.item_height,
                    node: (self.render)(item, index),
                }
            })
            .collect();
        self.surface.render(slice);
    }
}

impl<T, N, S> Drop for VirtualScroll<T, N, S>
where
    S: ScrollSurface<N>,
{
    fn drop(&mut self) {
        self.destroy();
    }
}

impl<T, N, S> fmt::Debug for VirtualScroll<T, N, S>
where
    S: ScrollSurface<N>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualScroll")
            .field("items", &self.items.len())
            .field("item_height", &self.item_height)
            .field("scroll_top", &self.scroll_top)
            .field("range", &self.range)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}
