//! Integration tests for the cloud namespace services.

mod helpers;

use futures::StreamExt;
use homecloud_core::ErrorKind;
use homecloud_core::error::codes;
use homecloud_service::cloud::{LookupResult, NodeChange, RegisterFile};
use homecloud_storage::checksum::{hex_to_base64, sha256_hex};

use helpers::{TestEnv, body, chunked};

fn file_input(parent_id: Option<uuid::Uuid>, name: &str) -> RegisterFile {
    RegisterFile {
        parent_id,
        name: name.to_string(),
        ..RegisterFile::default()
    }
}

#[tokio::test]
async fn test_nested_file_paths() {
    let env = TestEnv::new().await;
    let (_, ctx) = env.register("alice").await;

    let docs = env.services.directories.create(&ctx, None, "docs").await.unwrap();
    assert_eq!(docs.virtual_path, "alice/docs/");
    assert_eq!(docs.path, "cloud/user/alice/docs/");

    let file = env
        .services
        .files
        .register(&ctx, file_input(Some(docs.id), "a.txt"))
        .await
        .unwrap();
    assert_eq!(file.virtual_path, "alice/docs/a.txt");
    assert_eq!(file.path, "cloud/user/alice/docs/a.txt");
    assert!(!file.uploaded);
}

#[tokio::test]
async fn test_sibling_names_are_unique() {
    let env = TestEnv::new().await;
    let (_, ctx) = env.register("alice").await;
    let docs = env.services.directories.create(&ctx, None, "docs").await.unwrap();

    env.services
        .files
        .register(&ctx, file_input(Some(docs.id), "a.txt"))
        .await
        .unwrap();
    let err = env
        .services
        .files
        .register(&ctx, file_input(Some(docs.id), "a.txt"))
        .await
        .unwrap_err();
    assert_eq!(err.code, codes::DUPLICATE_OBJECT_NAME);

    // A file and a directory with the same display name clash too.
    let err = env
        .services
        .files
        .register(&ctx, file_input(None, "docs"))
        .await
        .unwrap_err();
    assert_eq!(err.code, codes::DUPLICATE_OBJECT_NAME);

    // Comparison is case-sensitive.
    env.services
        .files
        .register(&ctx, file_input(Some(docs.id), "A.txt"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_illegal_names_are_rejected() {
    let env = TestEnv::new().await;
    let (_, ctx) = env.register("alice").await;

    for name in ["", "   ", "a/b", "what?", "..", "pipe|name"] {
        let err = env
            .services
            .directories
            .create(&ctx, None, name)
            .await
            .unwrap_err();
        assert_eq!(err.code, codes::ILLEGAL_OBJECT_NAME, "{name:?}");
    }

    let long = "x".repeat(300);
    let err = env
        .services
        .files
        .register(&ctx, file_input(None, &long))
        .await
        .unwrap_err();
    assert_eq!(err.code, codes::VIRTUAL_PATH_TOO_LONG);
}

#[tokio::test]
async fn test_upload_and_download() {
    let env = TestEnv::new().await;
    let (_, ctx) = env.register("alice").await;
    let file = env
        .services
        .files
        .register(&ctx, file_input(None, "notes.txt"))
        .await
        .unwrap();

    let data: &'static [u8] = b"the quick brown fox jumps over the lazy dog";
    let uploaded = env
        .services
        .transfers
        .upload(&ctx, file.id, chunked(data, 4), &sha256_hex(data), None)
        .await
        .unwrap();
    assert!(uploaded.uploaded);
    assert_eq!(uploaded.size_bytes, data.len() as i64);
    assert_eq!(uploaded.checksum.as_deref(), Some(sha256_hex(data).as_str()));
    assert_eq!(uploaded.content_type.as_deref(), Some("text/plain"));

    assert_eq!(env.storage.read_bytes(&file.path).await.unwrap().as_ref(), data);

    let ticket = env
        .services
        .transfers
        .download_request(&ctx, file.id)
        .await
        .unwrap();
    assert!(!ticket.presigned);
    assert_eq!(ticket.method, "GET");
    assert_eq!(
        ticket.url,
        format!("http://cloud.test/api/files/{}/content", file.id)
    );

    let (_, stream) = env.services.transfers.download(&ctx, file.id).await.unwrap();
    let chunks: Vec<_> = stream.collect().await;
    let received: Vec<u8> = chunks
        .into_iter()
        .flat_map(|c| c.unwrap().to_vec())
        .collect();
    assert_eq!(received, data);
}

#[tokio::test]
async fn test_checksum_mismatch_leaves_state_unchanged() {
    let env = TestEnv::new().await;
    let (_, ctx) = env.register("alice").await;
    let file = env
        .services
        .files
        .register(&ctx, file_input(None, "a.bin"))
        .await
        .unwrap();

    let err = env
        .services
        .transfers
        .upload(&ctx, file.id, body(b"payload"), &sha256_hex(b"other"), None)
        .await
        .unwrap_err();
    assert_eq!(err.code, codes::CHECKSUM_MISMATCH);
    assert_eq!(err.kind, ErrorKind::Validation);

    let after = env.services.files.get(&ctx, file.id).await.unwrap();
    assert!(!after.uploaded);
    assert!(!env.storage.exists(&file.path).await.unwrap());

    // A committed upload survives a later mismatching one.
    env.services
        .transfers
        .upload(&ctx, file.id, body(b"first"), &sha256_hex(b"first"), None)
        .await
        .unwrap();
    env.services
        .transfers
        .upload(&ctx, file.id, body(b"second"), &sha256_hex(b"nope"), None)
        .await
        .unwrap_err();
    let after = env.services.files.get(&ctx, file.id).await.unwrap();
    assert_eq!(after.checksum.as_deref(), Some(sha256_hex(b"first").as_str()));
    assert_eq!(env.storage.read_bytes(&file.path).await.unwrap().as_ref(), b"first");
}

#[tokio::test]
async fn test_declared_checksum_binds_first_upload() {
    let env = TestEnv::new().await;
    let (_, ctx) = env.register("alice").await;
    let file = env
        .services
        .files
        .register(
            &ctx,
            RegisterFile {
                parent_id: None,
                name: "photo.png".to_string(),
                size_bytes: Some(5),
                checksum: Some(sha256_hex(b"hello").to_uppercase()),
            },
        )
        .await
        .unwrap();

    let err = env
        .services
        .transfers
        .upload(&ctx, file.id, body(b"world"), &sha256_hex(b"world"), None)
        .await
        .unwrap_err();
    assert_eq!(err.code, codes::CHECKSUM_MISMATCH);

    let ok = env
        .services
        .transfers
        .upload(&ctx, file.id, body(b"hello"), &sha256_hex(b"hello"), None)
        .await
        .unwrap();
    assert!(ok.uploaded);
}

#[tokio::test]
async fn test_presigned_upload_commit() {
    let env = TestEnv::with_direct_storage().await;
    let (_, ctx) = env.register("alice").await;
    let file = env
        .services
        .files
        .register(&ctx, file_input(None, "notes.txt"))
        .await
        .unwrap();

    let ticket = env
        .services
        .transfers
        .upload_request(&ctx, file.id)
        .await
        .unwrap();
    assert!(ticket.presigned);
    assert_eq!(ticket.method, "PUT");
    assert!(ticket.headers.is_empty());
    let upload_id = ticket.upload_id.unwrap();
    assert_ne!(ticket.url, format!("direct://{}", file.path));

    env.put_signed(&ticket.url, b"hello").await;
    assert!(!env.storage.exists(&file.path).await.unwrap());

    let committed = env
        .services
        .transfers
        .complete_upload(&ctx, file.id, upload_id, &sha256_hex(b"hello"))
        .await
        .unwrap();
    assert!(committed.uploaded);
    assert_eq!(committed.size_bytes, 5);
    assert_eq!(committed.checksum.as_deref(), Some(sha256_hex(b"hello").as_str()));
    assert_eq!(env.storage.read_bytes(&file.path).await.unwrap().as_ref(), b"hello");
    let pending = ticket.url.trim_start_matches("direct://").to_string();
    assert!(!env.storage.exists(&pending).await.unwrap());

    let err = env
        .services
        .transfers
        .complete_upload(&ctx, file.id, uuid::Uuid::new_v4(), &sha256_hex(b"hello"))
        .await
        .unwrap_err();
    assert_eq!(err.code, codes::FILE_NOT_UPLOADED);
}

#[tokio::test]
async fn test_presigned_mismatch_is_discarded() {
    let env = TestEnv::with_direct_storage().await;
    let (_, ctx) = env.register("alice").await;
    let file = env
        .services
        .files
        .register(&ctx, file_input(None, "a.bin"))
        .await
        .unwrap();

    let ticket = env
        .services
        .transfers
        .upload_request(&ctx, file.id)
        .await
        .unwrap();
    env.put_signed(&ticket.url, b"payload").await;
    let err = env
        .services
        .transfers
        .complete_upload(&ctx, file.id, ticket.upload_id.unwrap(), &sha256_hex(b"other"))
        .await
        .unwrap_err();
    assert_eq!(err.code, codes::CHECKSUM_MISMATCH);

    let pending = ticket.url.trim_start_matches("direct://").to_string();
    assert!(!env.storage.exists(&pending).await.unwrap());
    assert!(!env.storage.exists(&file.path).await.unwrap());
    assert!(!env.services.files.get(&ctx, file.id).await.unwrap().uploaded);
}

#[tokio::test]
async fn test_presigned_mismatch_keeps_committed_content() {
    let env = TestEnv::with_direct_storage().await;
    let (_, ctx) = env.register("alice").await;
    let file = env
        .services
        .files
        .register(&ctx, file_input(None, "a.bin"))
        .await
        .unwrap();
    env.services
        .transfers
        .upload(&ctx, file.id, body(b"first"), &sha256_hex(b"first"), None)
        .await
        .unwrap();

    let ticket = env
        .services
        .transfers
        .upload_request(&ctx, file.id)
        .await
        .unwrap();
    env.put_signed(&ticket.url, b"evil").await;
    // An uncommitted direct upload never touches the stored object.
    assert_eq!(env.storage.read_bytes(&file.path).await.unwrap().as_ref(), b"first");

    let err = env
        .services
        .transfers
        .complete_upload(&ctx, file.id, ticket.upload_id.unwrap(), &sha256_hex(b"other"))
        .await
        .unwrap_err();
    assert_eq!(err.code, codes::CHECKSUM_MISMATCH);

    let after = env.services.files.get(&ctx, file.id).await.unwrap();
    assert!(after.uploaded);
    assert_eq!(after.checksum.as_deref(), Some(sha256_hex(b"first").as_str()));
    let stored = env.storage.read_bytes(&file.path).await.unwrap();
    assert_eq!(stored.as_ref(), b"first");
    assert_eq!(sha256_hex(&stored), sha256_hex(b"first"));
}

#[tokio::test]
async fn test_presigned_upload_binds_declared_checksum() {
    let env = TestEnv::with_direct_storage().await;
    let (_, ctx) = env.register("alice").await;
    let file = env
        .services
        .files
        .register(
            &ctx,
            RegisterFile {
                parent_id: None,
                name: "photo.png".to_string(),
                size_bytes: Some(5),
                checksum: Some(sha256_hex(b"hello")),
            },
        )
        .await
        .unwrap();

    let ticket = env
        .services
        .transfers
        .upload_request(&ctx, file.id)
        .await
        .unwrap();
    assert_eq!(
        ticket.headers,
        vec![(
            "x-amz-checksum-sha256".to_string(),
            hex_to_base64(&sha256_hex(b"hello")).unwrap()
        )]
    );

    env.put_signed(&ticket.url, b"hello").await;
    env.services
        .transfers
        .complete_upload(&ctx, file.id, ticket.upload_id.unwrap(), &sha256_hex(b"hello"))
        .await
        .unwrap();

    // Once content is committed the declared checksum no longer applies.
    let ticket = env
        .services
        .transfers
        .upload_request(&ctx, file.id)
        .await
        .unwrap();
    assert!(ticket.headers.is_empty());
}

#[tokio::test]
async fn test_upload_size_limit() {
    let mut config = homecloud_core::config::AppConfig::default();
    config.storage.max_upload_size_bytes = 8;
    let env = TestEnv::with_config(config).await;
    let (_, ctx) = env.register("alice").await;
    let file = env
        .services
        .files
        .register(&ctx, file_input(None, "big.dat"))
        .await
        .unwrap();

    let data: &'static [u8] = b"0123456789abcdef";
    let err = env
        .services
        .transfers
        .upload(&ctx, file.id, chunked(data, 4), &sha256_hex(data), None)
        .await
        .unwrap_err();
    assert_eq!(err.code, codes::UPLOAD_TOO_LARGE);
    assert!(!env.services.files.get(&ctx, file.id).await.unwrap().uploaded);
}

#[tokio::test]
async fn test_transfer_authorization() {
    let env = TestEnv::new().await;
    let (_, alice) = env.register("alice").await;
    let (_, bob) = env.register("bob").await;
    let file = env
        .services
        .files
        .register(&alice, file_input(None, "secret.txt"))
        .await
        .unwrap();

    let err = env
        .services
        .transfers
        .upload_request(&bob, file.id)
        .await
        .unwrap_err();
    assert_eq!(err.code, codes::NO_WRITE_PERMISSION);
    assert_eq!(err.kind, ErrorKind::Authorization);

    let err = env
        .services
        .transfers
        .download_request(&bob, file.id)
        .await
        .unwrap_err();
    assert_eq!(err.code, codes::NO_READ_PERMISSION);

    let err = env
        .services
        .transfers
        .download_request(&alice, file.id)
        .await
        .unwrap_err();
    assert_eq!(err.code, codes::FILE_NOT_UPLOADED);

    let err = env
        .services
        .transfers
        .upload_request(&alice, uuid::Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(err.code, codes::FILE_DOES_NOT_EXIST);

    let ticket = env
        .services
        .transfers
        .upload_request(&alice, file.id)
        .await
        .unwrap();
    assert_eq!(ticket.method, "POST");
    assert!(ticket.url.ends_with(&format!("/api/files/{}/content", file.id)));
}

#[tokio::test]
async fn test_delete_directory_removes_content() {
    let env = TestEnv::new().await;
    let (_, ctx) = env.register("alice").await;
    let docs = env.services.directories.create(&ctx, None, "docs").await.unwrap();
    let sub = env
        .services
        .directories
        .create(&ctx, Some(docs.id), "sub")
        .await
        .unwrap();
    let a = env
        .services
        .files
        .register(&ctx, file_input(Some(docs.id), "a.txt"))
        .await
        .unwrap();
    let b = env
        .services
        .files
        .register(&ctx, file_input(Some(sub.id), "b.txt"))
        .await
        .unwrap();
    for (file, data) in [(&a, b"aaa" as &'static [u8]), (&b, b"bbb")] {
        env.services
            .transfers
            .upload(&ctx, file.id, body(data), &sha256_hex(data), None)
            .await
            .unwrap();
    }

    env.services.directories.delete(&ctx, docs.id).await.unwrap();

    assert!(!env.storage.exists(&a.path).await.unwrap());
    assert!(!env.storage.exists(&b.path).await.unwrap());
    let err = env.services.files.get(&ctx, b.id).await.unwrap_err();
    assert_eq!(err.code, codes::FILE_DOES_NOT_EXIST);
    let err = env.services.directories.get(&ctx, sub.id).await.unwrap_err();
    assert_eq!(err.code, codes::DIRECTORY_DOES_NOT_EXIST);
    assert!(env.services.directories.root(&ctx).await.unwrap().directories.is_empty());
}

#[tokio::test]
async fn test_failed_directory_delete_keeps_records_consistent() {
    let env = TestEnv::with_direct_storage().await;
    let (_, ctx) = env.register("alice").await;
    let docs = env.services.directories.create(&ctx, None, "docs").await.unwrap();
    let mut files = Vec::new();
    for (name, data) in [
        ("a.txt", b"aaa" as &'static [u8]),
        ("b.txt", b"bbb"),
        ("c.txt", b"ccc"),
    ] {
        let file = env
            .services
            .files
            .register(&ctx, file_input(Some(docs.id), name))
            .await
            .unwrap();
        env.services
            .transfers
            .upload(&ctx, file.id, body(data), &sha256_hex(data), None)
            .await
            .unwrap();
        files.push(file);
    }

    env.direct.as_ref().unwrap().fail_deletes_after(2);
    let err = env.services.directories.delete(&ctx, docs.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Storage);

    env.services.directories.get(&ctx, docs.id).await.unwrap();
    let mut still_uploaded = 0;
    for file in &files {
        let record = env.services.files.get(&ctx, file.id).await.unwrap();
        let stored = env.storage.exists(&file.path).await.unwrap();
        assert_eq!(record.uploaded, stored, "{}", file.virtual_name);
        if record.uploaded {
            still_uploaded += 1;
        }
    }
    assert_eq!(still_uploaded, 1);
}

#[tokio::test]
async fn test_rename_directory_keeps_stored_names() {
    let env = TestEnv::new().await;
    let (_, ctx) = env.register("alice").await;
    let docs = env.services.directories.create(&ctx, None, "docs").await.unwrap();
    let file = env
        .services
        .files
        .register(&ctx, file_input(Some(docs.id), "a.txt"))
        .await
        .unwrap();

    let renamed = env
        .services
        .directories
        .update(
            &ctx,
            docs.id,
            NodeChange {
                name: Some("papers".to_string()),
                parent_id: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.virtual_path, "alice/papers/");
    assert_eq!(renamed.path, "cloud/user/alice/docs/");

    let file = env.services.files.get(&ctx, file.id).await.unwrap();
    assert_eq!(file.virtual_path, "alice/papers/a.txt");
    assert_eq!(file.path, "cloud/user/alice/docs/a.txt");
}

#[tokio::test]
async fn test_move_relocates_content() {
    let env = TestEnv::new().await;
    let (_, ctx) = env.register("alice").await;
    let docs = env.services.directories.create(&ctx, None, "docs").await.unwrap();
    let archive = env.services.directories.create(&ctx, None, "archive").await.unwrap();
    let file = env
        .services
        .files
        .register(&ctx, file_input(Some(docs.id), "a.txt"))
        .await
        .unwrap();
    env.services
        .transfers
        .upload(&ctx, file.id, body(b"moved"), &sha256_hex(b"moved"), None)
        .await
        .unwrap();

    let moved = env
        .services
        .directories
        .update(
            &ctx,
            docs.id,
            NodeChange {
                name: None,
                parent_id: Some(Some(archive.id)),
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.virtual_path, "alice/archive/docs/");
    assert_eq!(moved.path, "cloud/user/alice/archive/docs/");

    let file = env.services.files.get(&ctx, file.id).await.unwrap();
    assert_eq!(file.path, "cloud/user/alice/archive/docs/a.txt");
    assert_eq!(env.storage.read_bytes(&file.path).await.unwrap().as_ref(), b"moved");
    assert!(!env.storage.exists("cloud/user/alice/docs/a.txt").await.unwrap());

    // Back to the root.
    let back = env
        .services
        .files
        .update(
            &ctx,
            file.id,
            NodeChange {
                name: Some("b.txt".to_string()),
                parent_id: Some(None),
            },
        )
        .await
        .unwrap();
    assert_eq!(back.virtual_path, "alice/b.txt");
    assert_eq!(back.path, "cloud/user/alice/a.txt");
    assert_eq!(env.storage.read_bytes(&back.path).await.unwrap().as_ref(), b"moved");
}

#[tokio::test]
async fn test_move_into_descendant_is_invalid() {
    let env = TestEnv::new().await;
    let (_, ctx) = env.register("alice").await;
    let docs = env.services.directories.create(&ctx, None, "docs").await.unwrap();
    let sub = env
        .services
        .directories
        .create(&ctx, Some(docs.id), "sub")
        .await
        .unwrap();

    for target in [docs.id, sub.id] {
        let err = env
            .services
            .directories
            .update(
                &ctx,
                docs.id,
                NodeChange {
                    name: None,
                    parent_id: Some(Some(target)),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, codes::INVALID_MOVE);
    }
}

#[tokio::test]
async fn test_move_rechecks_uniqueness_and_stored_names() {
    let env = TestEnv::new().await;
    let (_, ctx) = env.register("alice").await;
    let docs = env.services.directories.create(&ctx, None, "docs").await.unwrap();
    let root_file = env
        .services
        .files
        .register(&ctx, file_input(None, "a.txt"))
        .await
        .unwrap();
    let inner = env
        .services
        .files
        .register(&ctx, file_input(Some(docs.id), "a.txt"))
        .await
        .unwrap();

    let to_root = NodeChange {
        name: None,
        parent_id: Some(None),
    };
    let err = env
        .services
        .files
        .update(&ctx, inner.id, to_root.clone())
        .await
        .unwrap_err();
    assert_eq!(err.code, codes::DUPLICATE_OBJECT_NAME);

    // Free the display name; the stored name `a.txt` stays taken.
    env.services
        .files
        .update(
            &ctx,
            root_file.id,
            NodeChange {
                name: Some("old.txt".to_string()),
                parent_id: None,
            },
        )
        .await
        .unwrap();
    let moved = env.services.files.update(&ctx, inner.id, to_root).await.unwrap();
    assert_eq!(moved.virtual_path, "alice/a.txt");
    assert_ne!(moved.path, "cloud/user/alice/a.txt");
    assert!(moved.path.starts_with("cloud/user/alice/a_"));
    assert!(moved.path.ends_with(".txt"));
}

#[tokio::test]
async fn test_foreign_directories_are_not_writable() {
    let env = TestEnv::new().await;
    let (_, alice) = env.register("alice").await;
    let (_, bob) = env.register("bob").await;
    let docs = env.services.directories.create(&alice, None, "docs").await.unwrap();

    let err = env
        .services
        .directories
        .create(&bob, Some(docs.id), "intruder")
        .await
        .unwrap_err();
    assert_eq!(err.code, codes::NO_WRITE_PERMISSION);

    let err = env.services.directories.children(&bob, docs.id).await.unwrap_err();
    assert_eq!(err.code, codes::NO_READ_PERMISSION);

    let err = env.services.directories.delete(&bob, docs.id).await.unwrap_err();
    assert_eq!(err.code, codes::NO_WRITE_PERMISSION);
}

#[tokio::test]
async fn test_tree_and_lookup() {
    let env = TestEnv::new().await;
    let (_, ctx) = env.register("alice").await;
    let docs = env.services.directories.create(&ctx, None, "docs").await.unwrap();
    env.services
        .files
        .register(&ctx, file_input(Some(docs.id), "a.txt"))
        .await
        .unwrap();
    env.services
        .files
        .register(&ctx, file_input(None, "readme.md"))
        .await
        .unwrap();

    let tree = env.services.directories.tree(&ctx).await.unwrap();
    assert_eq!(tree.len(), 2);
    assert_eq!(tree[0].name, "docs");
    assert_eq!(tree[0].children[0].virtual_path, "alice/docs/a.txt");
    assert_eq!(tree[1].name, "readme.md");

    match env.services.directories.lookup(&ctx, "docs").await.unwrap() {
        LookupResult::Directory(dir) => assert_eq!(dir.id, docs.id),
        other => panic!("unexpected lookup result: {other:?}"),
    }
    match env
        .services
        .directories
        .lookup(&ctx, "alice/docs/a.txt")
        .await
        .unwrap()
    {
        LookupResult::File(file) => assert_eq!(file.virtual_name, "a.txt"),
        other => panic!("unexpected lookup result: {other:?}"),
    }
    assert!(matches!(
        env.services.directories.lookup(&ctx, "/alice/").await.unwrap(),
        LookupResult::Root
    ));
    let err = env
        .services
        .directories
        .lookup(&ctx, "missing")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_lookup_username_prefix_is_qualified() {
    let env = TestEnv::new().await;
    let (_, ctx) = env.register("alice").await;
    let named = env.services.directories.create(&ctx, None, "alice").await.unwrap();

    assert!(matches!(
        env.services.directories.lookup(&ctx, "alice").await.unwrap(),
        LookupResult::Root
    ));
    match env.services.directories.lookup(&ctx, "alice/alice").await.unwrap() {
        LookupResult::Directory(dir) => assert_eq!(dir.id, named.id),
        other => panic!("unexpected lookup result: {other:?}"),
    }
}

#[tokio::test]
async fn test_delete_content_and_file() {
    let env = TestEnv::new().await;
    let (_, ctx) = env.register("alice").await;
    let file = env
        .services
        .files
        .register(&ctx, file_input(None, "a.txt"))
        .await
        .unwrap();

    let err = env
        .services
        .files
        .delete_content(&ctx, file.id)
        .await
        .unwrap_err();
    assert_eq!(err.code, codes::FILE_NOT_UPLOADED);

    env.services
        .transfers
        .upload(&ctx, file.id, body(b"data"), &sha256_hex(b"data"), None)
        .await
        .unwrap();
    let cleared = env.services.files.delete_content(&ctx, file.id).await.unwrap();
    assert!(!cleared.uploaded);
    assert!(cleared.checksum.is_none());
    assert!(!env.storage.exists(&file.path).await.unwrap());

    env.services.files.delete(&ctx, file.id).await.unwrap();
    let err = env.services.files.get(&ctx, file.id).await.unwrap_err();
    assert_eq!(err.code, codes::FILE_DOES_NOT_EXIST);
}
