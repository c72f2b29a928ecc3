use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_zero_capacity_holds_one() {
    let mut c: LruCache<&str, i32> = LruCache::new(0);
    assert_eq!(c.capacity(), 1);
    c.insert("a", 1);
    c.insert("b", 2);
    assert_eq!(c.len(), 1);
    assert_eq!(c.get(&"b"), Some(2));
    assert_eq!(c.get(&"a"), None);
}

#[test]
fn test_get_and_insert() {
    let mut c = LruCache::new(4);
    assert!(c.is_empty());
    c.insert("x".to_string(), vec![1, 2]);
    assert_eq!(c.get(&"x".to_string()), Some(vec![1, 2]));
    assert!(c.contains_key(&"x".to_string()));
    assert_eq!(c.get(&"y".to_string()), None);
}

#[test]
fn test_least_recently_used_is_evicted() {
    let mut c = LruCache::new(2);
    c.insert(1, "one");
    c.insert(2, "two");
    // Touch 1 so 2 becomes the oldest.
    assert_eq!(c.get(&1), Some("one"));
    c.insert(3, "three");
    assert!(c.contains_key(&1));
    assert!(!c.contains_key(&2));
    assert!(c.contains_key(&3));
}

#[test]
fn test_replacing_a_key_keeps_size_and_refreshes() {
    let mut c = LruCache::new(2);
    c.insert(1, 10);
    c.insert(2, 20);
    c.insert(1, 11);
    assert_eq!(c.len(), 2);
    c.insert(3, 30);
    assert_eq!(c.get(&1), Some(11));
    assert_eq!(c.get(&2), None);
}

#[test]
fn test_clear() {
    let mut c = LruCache::new(3);
    c.insert('a', 1);
    c.insert('b', 2);
    c.clear();
    assert!(c.is_empty());
    c.insert('c', 3);
    assert_eq!(c.len(), 1);
}

#[test]
fn test_many_inserts_stay_bounded() {
    let mut c = LruCache::new(8);
    for i in 0..100 {
        c.insert(i, i * 2);
    }
    assert_eq!(c.len(), 8);
    for i in 92..100 {
        assert_eq!(c.get(&i), Some(i * 2));
    }
}
