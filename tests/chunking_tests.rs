use rand::Rng;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

use davferry::chunking::{
    merge_file_parts, merge_file_parts_with_cancellation, split_file, split_file_with_cancellation,
};
use davferry::TransferError;

fn random_bytes(len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    rand::thread_rng().fill(&mut data[..]);
    data
}

#[tokio::test]
async fn test_split_10000_bytes_into_3_parts() {
    let dir = tempdir().unwrap();
    let work = dir.path().join("work");
    let source = dir.path().join("data.bin");
    let content = random_bytes(10_000);
    tokio::fs::write(&source, &content).await.unwrap();

    let chunk_dir = split_file(&source, &work, 3).await.unwrap();
    assert_eq!(chunk_dir, work.join("data.bin"));

    let expected_sizes = [3333u64, 3333, 3334];
    for (i, expected) in expected_sizes.iter().enumerate() {
        let part = chunk_dir.join(format!("data.bin.part{}", i));
        let len = tokio::fs::metadata(&part).await.unwrap().len();
        assert_eq!(len, *expected, "part {} size", i);
    }
}

#[tokio::test]
async fn test_split_merge_round_trip_is_byte_exact() {
    let dir = tempdir().unwrap();
    let work = dir.path().join("work");
    let dest = dir.path().join("out");
    let source = dir.path().join("payload.dat");

    let content = random_bytes(10_000);
    tokio::fs::write(&source, &content).await.unwrap();

    split_file(&source, &work, 3).await.unwrap();
    let merged = merge_file_parts(&dest, &work, "payload.dat", 3)
        .await
        .unwrap();

    assert_eq!(merged, dest.join("payload.dat"));
    let restored = tokio::fs::read(&merged).await.unwrap();
    assert_eq!(restored, content);

    // Successful merge cleans up the part directory.
    assert!(!work.join("payload.dat").exists());
}

#[tokio::test]
async fn test_round_trip_various_sizes_and_part_counts() {
    let dir = tempdir().unwrap();

    for (size, parts) in [(1usize, 1u32), (5, 5), (7, 3), (1024, 4), (100_001, 7)] {
        let work = dir.path().join(format!("work-{}-{}", size, parts));
        let dest = dir.path().join(format!("dest-{}-{}", size, parts));
        let source = dir.path().join(format!("f-{}-{}.bin", size, parts));

        let content = random_bytes(size);
        tokio::fs::write(&source, &content).await.unwrap();

        let chunk_dir = split_file(&source, &work, parts).await.unwrap();

        // All parts but the last hold floor(size / parts) bytes.
        let part_size = size as u64 / u64::from(parts);
        for i in 0..parts - 1 {
            let len = tokio::fs::metadata(chunk_dir.join(format!(
                "{}.part{}",
                source.file_name().unwrap().to_str().unwrap(),
                i
            )))
            .await
            .unwrap()
            .len();
            assert_eq!(len, part_size);
        }

        let merged = merge_file_parts(
            &dest,
            &work,
            source.file_name().unwrap().to_str().unwrap(),
            parts,
        )
        .await
        .unwrap();
        assert_eq!(tokio::fs::read(&merged).await.unwrap(), content);
    }
}

#[tokio::test]
async fn test_split_rejects_zero_parts() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("data.bin");
    tokio::fs::write(&source, b"abc").await.unwrap();

    let result = split_file(&source, dir.path(), 0).await;
    assert!(matches!(result, Err(TransferError::Configuration { .. })));
}

#[tokio::test]
async fn test_split_clears_stale_parts() {
    let dir = tempdir().unwrap();
    let work = dir.path().join("work");
    let source = dir.path().join("data.bin");
    tokio::fs::write(&source, &random_bytes(100)).await.unwrap();

    let chunk_dir = split_file(&source, &work, 4).await.unwrap();
    // A second run with fewer parts must not leave part3 behind.
    split_file(&source, &work, 2).await.unwrap();

    assert!(chunk_dir.join("data.bin.part1").exists());
    assert!(!chunk_dir.join("data.bin.part2").exists());
    assert!(!chunk_dir.join("data.bin.part3").exists());
}

#[tokio::test]
async fn test_cancellation_stops_a_split() {
    let dir = tempdir().unwrap();
    let work = dir.path().join("work");
    let source = dir.path().join("data.bin");
    tokio::fs::write(&source, &random_bytes(1_000)).await.unwrap();

    let token = CancellationToken::new();
    token.cancel();

    let result = split_file_with_cancellation(&source, &work, 4, &token).await;
    assert!(matches!(result, Err(TransferError::Cancelled)));
    assert!(!work.join("data.bin").join("data.bin.part0").exists());
}

#[tokio::test]
async fn test_cancellation_stops_a_merge_before_output() {
    let dir = tempdir().unwrap();
    let work = dir.path().join("work");
    let dest = dir.path().join("out");
    let source = dir.path().join("data.bin");
    tokio::fs::write(&source, &random_bytes(1_000)).await.unwrap();

    split_file(&source, &work, 2).await.unwrap();

    let token = CancellationToken::new();
    token.cancel();

    let result = merge_file_parts_with_cancellation(&dest, &work, "data.bin", 2, &token).await;
    assert!(matches!(result, Err(TransferError::Cancelled)));
    assert!(!dest.join("data.bin").exists());
}

#[tokio::test]
async fn test_merge_with_missing_part_writes_nothing() {
    let dir = tempdir().unwrap();
    let work = dir.path().join("work");
    let dest = dir.path().join("out");
    let source = dir.path().join("data.bin");
    tokio::fs::write(&source, &random_bytes(5_000)).await.unwrap();

    let chunk_dir = split_file(&source, &work, 4).await.unwrap();
    tokio::fs::remove_file(chunk_dir.join("data.bin.part2"))
        .await
        .unwrap();

    let result = merge_file_parts(&dest, &work, "data.bin", 4).await;
    match result {
        Err(TransferError::IncompleteTransfer { path }) => {
            assert!(path.ends_with("data.bin.part2"));
        }
        other => panic!("expected IncompleteTransfer, got {:?}", other),
    }

    // No output file and no concatenation artifact.
    assert!(!dest.join("data.bin").exists());
    assert!(!chunk_dir.join("data.bin").exists());
}

#[tokio::test]
async fn test_merge_without_chunk_directory_fails() {
    let dir = tempdir().unwrap();
    let result = merge_file_parts(dir.path(), dir.path(), "ghost.bin", 2).await;
    assert!(matches!(
        result,
        Err(TransferError::IncompleteTransfer { .. })
    ));
}

#[tokio::test]
async fn test_merge_uses_base_name_of_file_argument() {
    let dir = tempdir().unwrap();
    let work = dir.path().join("work");
    let dest = dir.path().join("out");
    let source = dir.path().join("report.pdf");
    let content = random_bytes(300);
    tokio::fs::write(&source, &content).await.unwrap();

    split_file(&source, &work, 2).await.unwrap();

    // Callers sometimes pass a full remote path; only the base name counts.
    let merged = merge_file_parts(&dest, &work, "Documents/report.pdf", 2)
        .await
        .unwrap();
    assert_eq!(tokio::fs::read(&merged).await.unwrap(), content);
}
