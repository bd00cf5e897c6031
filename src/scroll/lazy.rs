/// 矩形区域，坐标向下为正
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// 四周各扩展 margin
    pub fn expand(&self, margin: f64) -> Self {
        Self {
            x: self.x - margin,
            y: self.y - margin,
            width: (self.width + 2.0 * margin).max(0.0),
            height: (self.height + 2.0 * margin).max(0.0),
        }
    }

    /// 边缘相接也算相交
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.x <= other.right()
            && other.x <= self.right()
            && self.y <= other.bottom()
            && other.y <= self.bottom()
    }
}

/// 默认预加载边距，进入视口前 50px 开始加载
pub const DEFAULT_ROOT_MARGIN: f64 = 50.0;

/// 懒加载观察器
///
/// 目标进入（扩展后的）视口时触发一次，随后自动取消观察。
#[derive(Debug)]
pub struct LazyLoader<K> {
    targets: Vec<(K, Bounds)>,
    root_margin: f64,
}

impl<K: PartialEq> Default for LazyLoader<K> {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT_MARGIN)
    }
}

impl<K: PartialEq> LazyLoader<K> {
    pub fn new(root_margin: f64) -> Self {
        Self {
            targets: Vec::new(),
            root_margin,
        }
    }

    /// 开始观察，重复观察同一目标时更新其位置
    pub fn observe(&mut self, key: K, bounds: Bounds) {
        match self.targets.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = bounds,
            None => self.targets.push((key, bounds)),
        }
    }

    pub fn unobserve(&mut self, key: &K) -> bool {
        let before = self.targets.len();
        self.targets.retain(|(k, _)| k != key);
        before != self.targets.len()
    }

    pub fn disconnect(&mut self) {
        self.targets.clear();
    }

    pub fn pending(&self) -> usize {
        self.targets.len()
    }

    /// 视口变化时调用，返回本次需要加载的目标（按观察顺序）
    pub fn check(&mut self, viewport: Bounds) -> Vec<K> {
        let area = viewport.expand(self.root_margin);
        let mut ready = Vec::new();
        let mut remaining = Vec::with_capacity(self.targets.len());

        for (key, bounds) in self.targets.drain(..) {
            if area.intersects(&bounds) {
                ready.push(key);
            } else {
                remaining.push((key, bounds));
            }
        }
        self.targets = remaining;

        if !ready.is_empty() {
            tracing::debug!("Lazy loader released {} targets", ready.len());
        }
        ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(index: usize) -> Bounds {
        Bounds::new(0.0, index as f64 * 100.0, 300.0, 100.0)
    }

    #[test]
    fn targets_fire_once_within_margin() {
        let mut loader = LazyLoader::default();
        for i in 0..10 {
            loader.observe(format!("img-{}", i), row(i));
        }

        let viewport = Bounds::new(0.0, 0.0, 300.0, 260.0);
        // 0..=2 可见，img-3 落在 50px 边距内
        assert_eq!(loader.check(viewport), vec!["img-0", "img-1", "img-2", "img-3"]);
        assert_eq!(loader.pending(), 6);

        assert!(loader.check(viewport).is_empty());

        let scrolled = Bounds::new(0.0, 400.0, 300.0, 260.0);
        assert_eq!(loader.check(scrolled), vec!["img-4", "img-5", "img-6", "img-7"]);
    }

    #[test]
    fn zero_margin_excludes_nearby_targets() {
        let mut loader = LazyLoader::new(0.0);
        loader.observe(1, row(4));
        assert!(loader.check(Bounds::new(0.0, 0.0, 300.0, 340.0)).is_empty());
        assert_eq!(loader.pending(), 1);
    }

    #[test]
    fn observe_updates_existing_target() {
        let mut loader = LazyLoader::new(0.0);
        loader.observe("avatar", row(50));
        loader.observe("avatar", row(0));
        assert_eq!(loader.pending(), 1);
        assert_eq!(loader.check(row(0)), vec!["avatar"]);
    }

    #[test]
    fn unobserve_and_disconnect() {
        let mut loader = LazyLoader::default();
        loader.observe(1, row(0));
        loader.observe(2, row(1));

        assert!(loader.unobserve(&1));
        assert!(!loader.unobserve(&1));
        loader.disconnect();
        assert!(loader.check(row(0)).is_empty());
    }
}
