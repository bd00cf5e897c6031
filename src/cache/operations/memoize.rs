use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Mutex;

use serde::Serialize;

use crate::cache::keys::memo_key;
use crate::utils::lock;

/// 记忆化包装
///
/// 结果按参数的结构化序列化缓存，不做淘汰，调用方负责控制输入规模。
pub struct Memoize<A, R, F> {
    func: F,
    results: Mutex<HashMap<String, R>>,
    _args: PhantomData<fn(&A)>,
}

impl<A, R, F> Memoize<A, R, F>
where
    A: Serialize,
    R: Clone,
    F: Fn(&A) -> R,
{
    pub fn new(func: F) -> Self {
        Self {
            func,
            results: Mutex::new(HashMap::new()),
            _args: PhantomData,
        }
    }

    pub fn call(&self, args: &A) -> R {
        let Some(key) = memo_key(args) else {
            return (self.func)(args);
        };

        if let Some(hit) = lock(&self.results).get(&key) {
            return hit.clone();
        }

        // 计算期间不持锁，允许 func 递归调用自身
        let result = (self.func)(args);
        lock(&self.results).insert(key, result.clone());
        result
    }

    pub fn len(&self) -> usize {
        lock(&self.results).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        lock(&self.results).clear();
    }
}

pub fn memoize<A, R, F>(func: F) -> Memoize<A, R, F>
where
    A: Serialize,
    R: Clone,
    F: Fn(&A) -> R,
{
    Memoize::new(func)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Serialize)]
    struct GradeQuery {
        course_id: u32,
        term: String,
    }

    #[test]
    fn equal_arguments_invoke_once() {
        let calls = AtomicUsize::new(0);
        let average = memoize(|scores: &Vec<u32>| {
            calls.fetch_add(1, Ordering::SeqCst);
            scores.iter().sum::<u32>() / scores.len() as u32
        });

        assert_eq!(average.call(&vec![80, 90, 100]), 90);
        assert_eq!(average.call(&vec![80, 90, 100]), 90);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(average.call(&vec![70]), 70);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(average.len(), 2);
    }

    #[test]
    fn structural_not_reference_equality() {
        let calls = AtomicUsize::new(0);
        let lookup = memoize(|q: &GradeQuery| {
            calls.fetch_add(1, Ordering::SeqCst);
            format!("{}-{}", q.course_id, q.term)
        });

        let a = GradeQuery { course_id: 3, term: "fall".into() };
        let b = GradeQuery { course_id: 3, term: "fall".into() };
        assert_eq!(lookup.call(&a), lookup.call(&b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unserializable_arguments_bypass_cache() {
        let calls = AtomicUsize::new(0);
        let count = memoize(|m: &BTreeMap<(u8, u8), u8>| {
            calls.fetch_add(1, Ordering::SeqCst);
            m.len()
        });

        let mut m = BTreeMap::new();
        m.insert((1, 1), 1);
        count.call(&m);
        count.call(&m);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(count.is_empty());
    }

    #[test]
    fn nan_and_infinity_are_not_confused() {
        let calls = AtomicUsize::new(0);
        let is_nan = memoize(|x: &f64| {
            calls.fetch_add(1, Ordering::SeqCst);
            x.is_nan()
        });

        assert!(is_nan.call(&f64::NAN));
        assert!(!is_nan.call(&f64::INFINITY));
        assert!(!is_nan.call(&f64::NEG_INFINITY));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(is_nan.is_empty());
    }

    #[test]
    fn clear_forgets_results() {
        let calls = AtomicUsize::new(0);
        let double = memoize(|x: &i64| {
            calls.fetch_add(1, Ordering::SeqCst);
            x * 2
        });
        double.call(&4);
        double.clear();
        double.call(&4);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
