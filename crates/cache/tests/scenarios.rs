//! End-to-end memoization scenarios against a real cache directory

use diskmemo_cache::{CacheStats, CacheStore, Error, KeyArg, Shape, derive_key, digest, memoize};
use futures::StreamExt;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

#[test]
fn add_persists_under_namespace_directory() {
    let temp = TempDir::new().unwrap();
    let add = memoize("add")
        .cache_dir(temp.path())
        .namespace("module")
        .plain(|(a, b): (i64, i64)| Ok::<_, Error>(a + b))
        .unwrap();

    assert_eq!(add.call((2, 3)).unwrap(), 5);
    assert_eq!(add.call((2, 3)).unwrap(), 5);
    assert_eq!(add.stats(), CacheStats { hits: 1, misses: 1 });

    let key = digest("add:2_3");
    assert_eq!(key, derive_key("add", &(2, 3), false));
    let path = temp.path().join("module").join(format!("{key}.txt"));
    assert!(path.is_file());
    assert_eq!(fs::read_to_string(&path).unwrap().trim(), "5");

    // A second binding over the same directory sees the stored value.
    let again = memoize("add")
        .cache_dir(temp.path())
        .namespace("module")
        .plain(|(_, _): (i64, i64)| -> Result<i64, Error> {
            panic!("stored entry should have been used")
        })
        .unwrap();
    assert_eq!(again.call((2, 3)).unwrap(), 5);
    assert_eq!(again.stats(), CacheStats { hits: 1, misses: 0 });
}

#[tokio::test]
async fn suspending_multiply_counts_hits_and_misses() {
    let temp = TempDir::new().unwrap();
    let multiply = memoize("multiply")
        .cache_dir(temp.path())
        .suspending(|(a, b): (i64, i64)| async move {
            tokio::task::yield_now().await;
            Ok::<_, Error>(a * b)
        })
        .unwrap();

    assert_eq!(multiply.call((2, 3)).await.unwrap(), 6);
    assert_eq!(multiply.call((2, 3)).await.unwrap(), 6);
    assert_eq!(multiply.call((2, 4)).await.unwrap(), 8);
    assert_eq!(multiply.stats(), CacheStats { hits: 1, misses: 2 });
}

#[test]
fn repeat_word_sequence_is_replayed() {
    let temp = TempDir::new().unwrap();
    let calls = AtomicUsize::new(0);
    let repeat_word = memoize("repeat_word")
        .cache_dir(temp.path())
        .namespace("text")
        .sequence(|(word, times): (String, u32)| {
            calls.fetch_add(1, Ordering::SeqCst);
            (0..times)
                .map(|_| Ok::<_, Error>(word.clone()))
                .collect::<Vec<_>>()
        })
        .unwrap();

    for _ in 0..2 {
        let words: Vec<String> = repeat_word
            .call(("hi".to_string(), 3))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(words, ["hi", "hi", "hi"]);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(repeat_word.shape(), Shape::Sequence);
    assert_eq!(repeat_word.stats(), CacheStats { hits: 1, misses: 1 });
}

struct Calculator {
    offset: i64,
}

// Every calculator shares entries regardless of its state.
impl KeyArg for Calculator {
    fn key_text(&self) -> String {
        "Calculator".to_string()
    }
}

#[test]
fn method_receiver_is_left_out_of_key() {
    let temp = TempDir::new().unwrap();
    let shifted = memoize("shifted")
        .cache_dir(temp.path())
        .method(true)
        .plain(|(calc, x): (&Calculator, i64)| Ok::<_, Error>(calc.offset + x))
        .unwrap();

    let first = Calculator { offset: 10 };
    let second = Calculator { offset: 100 };
    assert_eq!(shifted.call((&first, 1)).unwrap(), 11);
    // Same non-receiver arguments, so the stored result is returned.
    assert_eq!(shifted.call((&second, 1)).unwrap(), 11);
    assert_eq!(shifted.hits(), 1);
    assert_eq!(
        shifted.handle().key_for(&(&second, 1_i64)),
        digest("shifted:1")
    );
}

#[test]
fn corrupt_entry_is_reported() {
    let temp = TempDir::new().unwrap();
    let add = memoize("add")
        .cache_dir(temp.path())
        .plain(|(a, b): (i64, i64)| Ok::<_, Error>(a + b))
        .unwrap();

    add.call((4, 4)).unwrap();
    let path = add.handle().entry_path(&(4, 4));
    fs::write(&path, "\u{0}garbage").unwrap();

    let err = add.call((4, 4)).unwrap_err();
    assert!(err.is_corrupt_entry());
    assert!(err.to_string().contains(&path.display().to_string()));
}

#[test]
fn dotted_namespace_nests_directories() {
    let temp = TempDir::new().unwrap();
    let binding = memoize("ping")
        .cache_dir(temp.path())
        .namespace("a.b")
        .plain(|(): ()| Ok::<_, Error>("pong".to_string()))
        .unwrap();
    binding.call(()).unwrap();

    let expected = temp
        .path()
        .join("a")
        .join("b")
        .join(format!("{}.txt", digest("ping")));
    assert!(expected.is_file());

    let store = CacheStore::open(temp.path(), None, "txt").unwrap();
    let entries = store.entries().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].namespace, "a.b");
    assert_eq!(entries[0].key, digest("ping"));
}

#[tokio::test]
async fn async_shapes_share_the_layout() {
    let temp = TempDir::new().unwrap();
    let fetch = memoize("fetch")
        .cache_dir(temp.path())
        .namespace("net")
        .suspending(|(id,): (u32,)| async move { Ok::<_, Error>(format!("item-{id}")) })
        .unwrap();
    let pages = memoize("pages")
        .cache_dir(temp.path())
        .namespace("net")
        .async_sequence(|(count,): (u32,)| {
            futures::stream::iter(1..=count).map(|page| Ok::<_, Error>(page * 10))
        })
        .unwrap();

    assert_eq!(fetch.call((9,)).await.unwrap(), "item-9");
    let collected: Vec<Result<u32, Error>> = pages.call((3,)).collect().await;
    let collected: Vec<u32> = collected.into_iter().map(Result::unwrap).collect();
    assert_eq!(collected, [10, 20, 30]);

    let store = CacheStore::open(temp.path(), Some("net"), "txt").unwrap();
    let keys: Vec<String> = store.entries().unwrap().into_iter().map(|e| e.key).collect();
    assert_eq!(keys.len(), 2);
    assert!(keys.contains(&digest("fetch:9")));
    assert!(keys.contains(&digest("pages:3")));
}
