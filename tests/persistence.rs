use std::path::PathBuf;

use resume_rag::search::{EntryMetadata, VectorIndex};
use resume_rag::{Config, EmbedderKind, ErrorKind, SearchService};
use tempfile::TempDir;

fn config_in(dir: &TempDir) -> Config {
    Config {
        data_dir: dir.path().to_path_buf(),
        ..Config::default()
    }
}

/// Run SQL against the on-disk index file from a second connection.
fn run_index_sql(config: &Config, sql: &str) {
    let conn = rusqlite::Connection::open(config.paths().index).unwrap();
    conn.execute_batch(sql).unwrap();
}

fn hit_ids(service: &SearchService, query: &str) -> Vec<i64> {
    service
        .search(query, 5)
        .unwrap()
        .iter()
        .map(|h| h.resume_id)
        .collect()
}

fn index_with(vectors: &[[f32; 3]]) -> VectorIndex {
    let mut index = VectorIndex::new(3);
    for (i, v) in vectors.iter().enumerate() {
        index
            .add(
                v.to_vec(),
                EntryMetadata {
                    document_id: i as i64 + 1,
                    display_name: format!("{}.pdf", i),
                    text: format!("Resume {}.", i),
                },
            )
            .unwrap();
    }
    index
}

#[test]
fn persist_then_load_gives_identical_results() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("index.db");

    let index = index_with(&[[0.0, 0.0, 1.0], [1.0, 1.0, 1.0], [0.2, 0.1, 0.9], [3.0, 0.0, 0.0]]);
    index.persist(&path).unwrap();

    let loaded = VectorIndex::load(&path, 3).unwrap();
    assert_eq!(loaded.len(), index.len());

    let query = [0.1, 0.1, 1.0];
    assert_eq!(
        loaded.search(&query, 4).unwrap(),
        index.search(&query, 4).unwrap()
    );
    for ordinal in 0..index.len() {
        assert_eq!(loaded.entry(ordinal).unwrap().metadata, index.entry(ordinal).unwrap().metadata);
        assert_eq!(loaded.entry(ordinal).unwrap().vector, index.entry(ordinal).unwrap().vector);
    }
}

#[test]
fn persist_overwrites_previous_snapshot() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("index.db");

    index_with(&[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]).persist(&path).unwrap();
    index_with(&[[0.0, 0.0, 1.0]]).persist(&path).unwrap();

    assert_eq!(VectorIndex::load(&path, 3).unwrap().len(), 1);
}

#[test]
fn missing_file_loads_empty() {
    let dir = TempDir::new().unwrap();
    let index = VectorIndex::load(&dir.path().join("absent.db"), 384).unwrap();
    assert!(index.is_empty());
    assert_eq!(index.dimension(), 384);
}

#[test]
fn corrupt_file_fails_loudly() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("index.db");
    std::fs::write(&path, vec![0xAB; 1024]).unwrap();

    let err = VectorIndex::load(&path, 3).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Persistence);
}

#[test]
fn empty_file_fails_loudly() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("index.db");
    std::fs::write(&path, b"").unwrap();

    let err = VectorIndex::load(&path, 3).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Persistence);
}

#[test]
fn dimension_change_fails_loudly() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("index.db");
    index_with(&[[1.0, 2.0, 3.0]]).persist(&path).unwrap();

    assert!(VectorIndex::load(&path, 4).is_err());
}

#[test]
fn ingest_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);

    let (kept, deleted) = {
        let service = SearchService::open(&config).unwrap();
        let kept = service
            .ingest_text("python.pdf", "Built scalable APIs in Python. Led a team of 5 engineers.")
            .unwrap();
        let deleted = service
            .ingest_text("chef.pdf", "Cooks French cuisine. Bakes bread every morning.")
            .unwrap();
        service.delete_document(deleted.id).unwrap();
        (kept, deleted)
    };

    let service = SearchService::open(&config).unwrap();
    let stats = service.stats().unwrap();
    assert_eq!(stats.entry_count, 2);
    assert_eq!(stats.live_count, 1);

    let hits = service.search("python", 5).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].resume_id, kept.id);
    assert!(service.get_document(deleted.id).is_err());
    assert_eq!(service.get_document(kept.id).unwrap().filename, "python.pdf");

    assert_eq!(service.compact().unwrap(), 1);
    drop(service);

    let service = SearchService::open(&config).unwrap();
    assert_eq!(service.stats().unwrap().entry_count, 1);
}

#[test]
fn reopening_with_other_dimension_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    {
        let service = SearchService::open(&config).unwrap();
        service.ingest_text("a.pdf", "Rust engineer.").unwrap();
    }

    let changed = Config {
        dimension: 64,
        embedder: EmbedderKind::Seeded,
        ..config_in(&dir)
    };
    assert!(SearchService::open(&changed).is_err());
}

#[test]
fn data_dir_is_created() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        data_dir: PathBuf::from(dir.path()).join("nested/data"),
        ..Config::default()
    };
    SearchService::open(&config).unwrap();
    assert!(config.data_dir.join("resumes.db").exists());
    assert!(config.data_dir.join("index.db").exists());
}

#[test]
fn failed_index_tombstone_leaves_resume_intact() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let service = SearchService::open(&config).unwrap();
    let resume = service
        .ingest_text("python.pdf", "Built scalable APIs in Python. Led a team of 5 engineers.")
        .unwrap();

    run_index_sql(
        &config,
        "CREATE TRIGGER refuse_update BEFORE UPDATE ON entries
         BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
    );

    let err = service.delete_document(resume.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Persistence);
    assert_eq!(hit_ids(&service, "python"), vec![resume.id]);
    assert!(service.get_document(resume.id).is_ok());
    assert_eq!(service.stats().unwrap().live_count, 1);

    run_index_sql(&config, "DROP TRIGGER refuse_update;");
    drop(service);

    let service = SearchService::open(&config).unwrap();
    assert_eq!(hit_ids(&service, "python"), vec![resume.id]);
    assert_eq!(service.get_document(resume.id).unwrap().filename, "python.pdf");

    assert_eq!(service.delete_document(resume.id).unwrap(), 1);
    assert!(hit_ids(&service, "python").is_empty());
}

#[test]
fn failed_index_append_leaves_no_partial_state() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let service = SearchService::open(&config).unwrap();
    let first = service
        .ingest_text("python.pdf", "Built scalable APIs in Python.")
        .unwrap();

    run_index_sql(
        &config,
        "CREATE TRIGGER refuse_insert BEFORE INSERT ON entries
         BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
    );

    let err = service
        .ingest_text("java.pdf", "Java developer with Spring and Kafka.")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Persistence);
    assert_eq!(service.stats().unwrap().entry_count, 1);
    assert_eq!(service.document_count().unwrap(), 1);
    assert_eq!(hit_ids(&service, "java spring kafka"), vec![first.id]);

    run_index_sql(&config, "DROP TRIGGER refuse_insert;");
    drop(service);

    let service = SearchService::open(&config).unwrap();
    assert_eq!(service.stats().unwrap().entry_count, 1);
    assert_eq!(service.document_count().unwrap(), 1);

    let retried = service
        .ingest_text("java.pdf", "Java developer with Spring and Kafka.")
        .unwrap();
    assert_eq!(service.stats().unwrap().entry_count, 2);
    assert_eq!(hit_ids(&service, "java spring kafka")[0], retried.id);
}

#[test]
fn flush_matches_incremental_writes() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let (kept, deleted) = {
        let service = SearchService::open(&config).unwrap();
        let kept = service.ingest_text("a.pdf", "Rust engineer.").unwrap();
        let deleted = service.ingest_text("b.pdf", "Pastry chef.").unwrap();
        service.delete_document(deleted.id).unwrap();
        service.flush().unwrap();
        (kept, deleted)
    };

    let service = SearchService::open(&config).unwrap();
    let stats = service.stats().unwrap();
    assert_eq!(stats.entry_count, 2);
    assert_eq!(stats.live_count, 1);
    let ids = hit_ids(&service, "rust");
    assert_eq!(ids, vec![kept.id]);
    assert!(!ids.contains(&deleted.id));
}
