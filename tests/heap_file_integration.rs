//! End-to-end tests for heap files over on-disk storage.
//!
//! These exercise the full stack (database façade, file storage, buffer
//! pool, and the heap layer) against real files in a temp directory.

use heapstore::db::Database;
use heapstore::heap::{
    AttrType, CompOp, HeapError, HeapFile, HeapFileScan, InsertFileScan, RecordId, ScanFilter,
};
use heapstore::storage::PAGE_SIZE;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

/// A database in a temp directory that lives as long as the fixture.
struct TestDb {
    _dir: TempDir,
    db: Database,
}

fn test_db() -> TestDb {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("db")).unwrap();
    TestDb { _dir: dir, db }
}

fn collect_scan(
    file: &mut HeapFile<
        '_,
        heapstore::storage::FileStorage,
        heapstore::storage::LruReplacer,
    >,
    filter: Option<ScanFilter>,
) -> Vec<RecordId> {
    let mut scan = HeapFileScan::new(file, filter);
    let mut rids = Vec::new();
    while let Some(rid) = scan.next().unwrap() {
        rids.push(rid);
    }
    rids
}

#[test]
fn test_fresh_file_counters() {
    let t = test_db();
    t.db.create_heap_file("t1").unwrap();

    let pool = t.db.open_heap_file("t1").unwrap();
    let file = HeapFile::open(&pool).unwrap();

    assert_eq!(file.rec_cnt(), 0);
    assert_eq!(file.page_cnt(), 1);
    assert_eq!(file.file_name(), "t1");
}

#[test]
fn test_insert_scan_small_relation() {
    let t = test_db();
    t.db.create_heap_file("t1").unwrap();
    let pool = t.db.open_heap_file("t1").unwrap();
    let mut file = HeapFile::open(&pool).unwrap();

    let inserted: Vec<RecordId> = {
        let mut insert = InsertFileScan::new(&mut file);
        [b"alpha".as_slice(), b"beta", b"gamma"]
            .iter()
            .map(|r| insert.insert(r).unwrap())
            .collect()
    };

    assert_eq!(file.rec_cnt(), 3);
    let yielded = collect_scan(&mut file, None);
    assert_eq!(yielded, inserted);

    assert_eq!(file.record(inserted[0]).unwrap(), b"alpha");
    assert_eq!(file.record(inserted[1]).unwrap(), b"beta");
    assert_eq!(file.record(inserted[2]).unwrap(), b"gamma");
}

#[test]
fn test_insert_scan_multiset_round_trip() {
    let t = test_db();
    t.db.create_heap_file("t1").unwrap();
    let pool = t.db.open_heap_file("t1").unwrap();
    let mut file = HeapFile::open(&pool).unwrap();

    // Random record lengths spanning several pages, fixed seed.
    let mut rng = StdRng::seed_from_u64(0xDB);
    let records: Vec<Vec<u8>> = (0..300)
        .map(|_| {
            let len = rng.gen_range(1..=512);
            (0..len).map(|_| rng.gen()).collect()
        })
        .collect();

    let inserted: Vec<RecordId> = {
        let mut insert = InsertFileScan::new(&mut file);
        records.iter().map(|r| insert.insert(r).unwrap()).collect()
    };
    assert!(file.page_cnt() > 1);
    assert_eq!(file.rec_cnt(), records.len() as u64);

    let yielded = collect_scan(&mut file, None);
    assert_eq!(yielded, inserted);
    for (record, rid) in records.iter().zip(&inserted) {
        assert_eq!(file.record(*rid).unwrap(), record.as_slice());
    }
}

#[test]
fn test_integer_filter_scan() {
    let t = test_db();
    t.db.create_heap_file("t1").unwrap();
    let pool = t.db.open_heap_file("t1").unwrap();
    let mut file = HeapFile::open(&pool).unwrap();

    let values = [5i32, 10, 15, 20];
    let inserted: Vec<RecordId> = {
        let mut insert = InsertFileScan::new(&mut file);
        values
            .iter()
            .map(|v| insert.insert(&v.to_le_bytes()).unwrap())
            .collect()
    };

    let filter = ScanFilter::from_raw(0, 4, AttrType::Int, &10i32.to_le_bytes(), CompOp::Gte)
        .unwrap();
    let yielded = collect_scan(&mut file, Some(filter));
    assert_eq!(yielded, inserted[1..].to_vec());

    let filter = ScanFilter::int(0, CompOp::Ne, 15);
    let yielded = collect_scan(&mut file, Some(filter));
    assert_eq!(yielded, vec![inserted[0], inserted[1], inserted[3]]);
}

#[test]
fn test_float_and_bytes_filter_scans() {
    let t = test_db();
    t.db.create_heap_file("t1").unwrap();
    let pool = t.db.open_heap_file("t1").unwrap();
    let mut file = HeapFile::open(&pool).unwrap();

    // Records: 4-byte float followed by a name.
    let rows: Vec<(f32, &[u8])> = vec![
        (1.5, b"ada"),
        (2.5, b"bob"),
        (3.5, b"cyd"),
    ];
    let inserted: Vec<RecordId> = {
        let mut insert = InsertFileScan::new(&mut file);
        rows.iter()
            .map(|(v, name)| {
                let mut rec = v.to_le_bytes().to_vec();
                rec.extend_from_slice(name);
                insert.insert(&rec).unwrap()
            })
            .collect()
    };

    let filter = ScanFilter::float(0, CompOp::Lt, 3.0);
    let yielded = collect_scan(&mut file, Some(filter));
    assert_eq!(yielded, inserted[..2].to_vec());

    let filter = ScanFilter::bytes(4, CompOp::Eq, b"bob".to_vec());
    let yielded = collect_scan(&mut file, Some(filter));
    assert_eq!(yielded, vec![inserted[1]]);

    let filter = ScanFilter::bytes(4, CompOp::Gte, b"bo".to_vec());
    let yielded = collect_scan(&mut file, Some(filter));
    assert_eq!(yielded, vec![inserted[1], inserted[2]]);
}

#[test]
fn test_pin_budget_across_operations() {
    let t = test_db();
    t.db.create_heap_file("t1").unwrap();
    let pool = t.db.open_heap_file("t1").unwrap();
    let mut file = HeapFile::open(&pool).unwrap();
    assert!(pool.pinned_pages() <= 2);

    let record = vec![1u8; 3000];
    let inserted: Vec<RecordId> = {
        let mut insert = InsertFileScan::new(&mut file);
        (0..9)
            .map(|_| {
                let rid = insert.insert(&record).unwrap();
                assert!(pool.pinned_pages() <= 2);
                rid
            })
            .collect()
    };

    {
        let mut scan = HeapFileScan::new(&mut file, None);
        while let Some(_rid) = scan.next().unwrap() {
            assert!(pool.pinned_pages() <= 2);
        }
    }

    for rid in &inserted {
        file.record(*rid).unwrap();
        assert!(pool.pinned_pages() <= 2);
    }

    drop(file);
    assert_eq!(pool.pinned_pages(), 0);
}

#[test]
fn test_mark_reset_scenario() {
    let t = test_db();
    t.db.create_heap_file("t1").unwrap();
    let pool = t.db.open_heap_file("t1").unwrap();
    let mut file = HeapFile::open(&pool).unwrap();

    {
        let mut insert = InsertFileScan::new(&mut file);
        for i in 0..8u8 {
            insert.insert(&vec![i; 2500]).unwrap();
        }
    }

    let mut scan = HeapFileScan::new(&mut file, None);
    scan.next().unwrap();
    scan.next().unwrap();
    scan.next().unwrap();

    scan.mark();
    let fourth = scan.next().unwrap();
    assert!(fourth.is_some());
    scan.next().unwrap();

    scan.reset().unwrap();
    assert_eq!(scan.next().unwrap(), fourth);
}

#[test]
fn test_delete_persists_across_reopen() {
    let t = test_db();
    t.db.create_heap_file("t1").unwrap();

    let (kept_first, deleted, kept_last) = {
        let pool = t.db.open_heap_file("t1").unwrap();
        let mut file = HeapFile::open(&pool).unwrap();

        let inserted: Vec<RecordId> = {
            let mut insert = InsertFileScan::new(&mut file);
            [b"a".as_slice(), b"b", b"c"]
                .iter()
                .map(|r| insert.insert(r).unwrap())
                .collect()
        };

        {
            let mut scan = HeapFileScan::new(&mut file, None);
            scan.next().unwrap();
            let second = scan.next().unwrap();
            assert_eq!(second, Some(inserted[1]));
            scan.delete_record().unwrap();
        }
        assert_eq!(file.rec_cnt(), 2);

        (inserted[0], inserted[1], inserted[2])
        // Handle and pool drop here; the pool flushes on drop.
    };

    let pool = t.db.open_heap_file("t1").unwrap();
    let mut file = HeapFile::open(&pool).unwrap();
    assert_eq!(file.rec_cnt(), 2);

    let remaining = collect_scan(&mut file, None);
    assert_eq!(remaining, vec![kept_first, kept_last]);
    assert!(!remaining.contains(&deleted));
    assert!(matches!(
        file.record(deleted),
        Err(HeapError::RecordNotFound(_))
    ));
}

#[test]
fn test_error_scenarios() {
    let t = test_db();
    t.db.create_heap_file("t1").unwrap();

    // Creating an existing heap file fails.
    assert!(matches!(
        t.db.create_heap_file("t1"),
        Err(HeapError::FileExists(_))
    ));

    // Invalid filter geometry fails.
    let value = 1i32.to_le_bytes();
    assert!(matches!(
        ScanFilter::from_raw(-1, 4, AttrType::Int, &value, CompOp::Eq),
        Err(HeapError::BadScanParam(_))
    ));
    assert!(matches!(
        ScanFilter::from_raw(0, 0, AttrType::Bytes, &value, CompOp::Eq),
        Err(HeapError::BadScanParam(_))
    ));

    // A page-sized record can never fit.
    let pool = t.db.open_heap_file("t1").unwrap();
    let mut file = HeapFile::open(&pool).unwrap();
    let oversized = vec![0u8; PAGE_SIZE];
    assert!(matches!(
        InsertFileScan::new(&mut file).insert(&oversized),
        Err(HeapError::InvalidRecordLength { .. })
    ));
    // Nothing was counted or kept.
    assert_eq!(file.rec_cnt(), 0);
    assert_eq!(collect_scan(&mut file, None), vec![]);
}

#[test]
fn test_bulk_insert_page_quarter_records() {
    let t = test_db();
    t.db.create_heap_file("bulk").unwrap();
    let pool = t.db.open_heap_file("bulk").unwrap();
    let mut file = HeapFile::open(&pool).unwrap();

    const N: usize = 10_000;
    let record_len = PAGE_SIZE / 4;

    let inserted: Vec<RecordId> = {
        let mut insert = InsertFileScan::new(&mut file);
        (0..N)
            .map(|i| {
                let mut record = vec![0u8; record_len];
                record[..8].copy_from_slice(&(i as u64).to_le_bytes());
                insert.insert(&record).unwrap()
            })
            .collect()
    };

    assert_eq!(file.rec_cnt(), N as u64);
    // Three quarter-page records fit per page, so at least ceil(N / 3)
    // pages must exist.
    assert!(file.page_cnt() >= (N as u64).div_ceil(3));

    for (i, rid) in inserted.iter().enumerate() {
        let record = file.record(*rid).unwrap();
        assert_eq!(record.len(), record_len);
        assert_eq!(&record[..8], &(i as u64).to_le_bytes());
    }
}

#[test]
fn test_update_through_scan_persists() {
    let t = test_db();
    t.db.create_heap_file("t1").unwrap();

    let rid = {
        let pool = t.db.open_heap_file("t1").unwrap();
        let mut file = HeapFile::open(&pool).unwrap();
        let rid = InsertFileScan::new(&mut file).insert(b"original").unwrap();

        let mut scan = HeapFileScan::new(&mut file, None);
        scan.next().unwrap();
        scan.update_record(b"replaced").unwrap();
        rid
    };

    let pool = t.db.open_heap_file("t1").unwrap();
    let mut file = HeapFile::open(&pool).unwrap();
    assert_eq!(file.record(rid).unwrap(), b"replaced");
}

#[test]
fn test_two_files_are_independent() {
    let t = test_db();
    t.db.create_heap_file("t1").unwrap();
    t.db.create_heap_file("t2").unwrap();

    let pool1 = t.db.open_heap_file("t1").unwrap();
    let pool2 = t.db.open_heap_file("t2").unwrap();
    let mut file1 = HeapFile::open(&pool1).unwrap();
    let mut file2 = HeapFile::open(&pool2).unwrap();

    InsertFileScan::new(&mut file1).insert(b"one").unwrap();
    InsertFileScan::new(&mut file2).insert(b"two").unwrap();
    InsertFileScan::new(&mut file2).insert(b"three").unwrap();

    assert_eq!(file1.rec_cnt(), 1);
    assert_eq!(file2.rec_cnt(), 2);
    assert_eq!(file1.file_name(), "t1");
    assert_eq!(file2.file_name(), "t2");
}
