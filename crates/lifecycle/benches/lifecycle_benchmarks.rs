use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use reclaim_core::{LifecycleConfig, Record, RecordId, SoftDeletable};
use reclaim_hooks::HookRegistry;
use reclaim_lifecycle::cascade::AssociationBinding;
use reclaim_lifecycle::engine::{LifecycleEngine, RestoreOptions};
use reclaim_lifecycle::record_store::{InMemoryRecordStore, RecordStore};
use reclaim_lifecycle::transaction::TransactionEnvelope;

#[derive(Debug, Clone)]
struct Task {
    id: RecordId,
    title: String,
    deleted_at: Option<DateTime<Utc>>,
    persisted: bool,
    frozen: bool,
}

impl Task {
    fn new(title: &str) -> Self {
        Self {
            id: RecordId::new(),
            title: title.to_string(),
            deleted_at: None,
            persisted: false,
            frozen: false,
        }
    }
}

impl Record for Task {
    type Id = RecordId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn table_name() -> &'static str {
        "tasks"
    }

    fn columns() -> &'static [&'static str] {
        &["id", "title", "deleted_at"]
    }
}

impl SoftDeletable for Task {
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    fn set_deleted_at(&mut self, marker: Option<DateTime<Utc>>) {
        self.deleted_at = marker;
    }

    fn is_persisted(&self) -> bool {
        self.persisted
    }

    fn mark_persisted(&mut self) {
        self.persisted = true;
    }

    fn is_frozen(&self) -> bool {
        self.frozen
    }

    fn freeze(&mut self) {
        self.frozen = true;
    }
}

#[derive(Debug, Clone)]
struct Subtask {
    id: RecordId,
    task_id: RecordId,
    deleted_at: Option<DateTime<Utc>>,
    persisted: bool,
    frozen: bool,
}

impl Subtask {
    fn new(task_id: RecordId) -> Self {
        Self {
            id: RecordId::new(),
            task_id,
            deleted_at: None,
            persisted: false,
            frozen: false,
        }
    }
}

impl Record for Subtask {
    type Id = RecordId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn table_name() -> &'static str {
        "subtasks"
    }

    fn columns() -> &'static [&'static str] {
        &["id", "task_id", "deleted_at"]
    }
}

impl SoftDeletable for Subtask {
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    fn set_deleted_at(&mut self, marker: Option<DateTime<Utc>>) {
        self.deleted_at = marker;
    }

    fn is_persisted(&self) -> bool {
        self.persisted
    }

    fn mark_persisted(&mut self) {
        self.persisted = true;
    }

    fn is_frozen(&self) -> bool {
        self.frozen
    }

    fn freeze(&mut self) {
        self.frozen = true;
    }
}

/// Naive hard-delete simulation: removal is unrecoverable, "undo" means
/// re-creating the row from a kept copy.
#[derive(Debug, Clone)]
struct NaiveCrudStore {
    inner: Arc<RwLock<HashMap<RecordId, Task>>>,
}

impl NaiveCrudStore {
    fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn insert(&self, task: Task) {
        self.inner.write().unwrap().insert(task.id, task);
    }

    fn remove(&self, id: &RecordId) -> Option<Task> {
        self.inner.write().unwrap().remove(id)
    }
}

type TaskEngine = LifecycleEngine<Task, Arc<InMemoryRecordStore<Task>>>;

fn setup_task_engine() -> (Arc<InMemoryRecordStore<Task>>, TaskEngine) {
    let envelope = Arc::new(TransactionEnvelope::new());
    let store = Arc::new(InMemoryRecordStore::new());
    envelope.register(store.clone());
    let engine = LifecycleEngine::new(
        store.clone(),
        HookRegistry::new(),
        envelope,
        LifecycleConfig::default(),
    )
    .expect("marker column present");
    (store, engine)
}

fn setup_cascade(subtasks: usize) -> (Arc<TaskEngine>, Task) {
    let envelope = Arc::new(TransactionEnvelope::new());
    let tasks: Arc<InMemoryRecordStore<Task>> = Arc::new(InMemoryRecordStore::new());
    let children: Arc<InMemoryRecordStore<Subtask>> = Arc::new(InMemoryRecordStore::new());
    envelope.register(tasks.clone());
    envelope.register(children.clone());

    let subtask_engine = Arc::new(
        LifecycleEngine::new(
            children.clone(),
            HookRegistry::new(),
            envelope.clone(),
            LifecycleConfig::default(),
        )
        .expect("marker column present"),
    );

    let mut task_engine = LifecycleEngine::new(
        tasks.clone(),
        HookRegistry::new(),
        envelope,
        LifecycleConfig::default(),
    )
    .expect("marker column present");
    task_engine.add_association(AssociationBinding::has_many(
        "subtasks",
        &subtask_engine,
        |task: &Task, subtask: &Subtask| subtask.task_id == task.id,
    ));

    let task = tasks.insert(Task::new("parent")).unwrap();
    for _ in 0..subtasks {
        children.insert(Subtask::new(task.id)).unwrap();
    }

    (Arc::new(task_engine), task)
}

fn bench_discard_restore_cycle(c: &mut Criterion) {
    let (store, engine) = setup_task_engine();
    let mut task = store.insert(Task::new("cycle")).unwrap();

    c.bench_function("discard_restore_cycle", |b| {
        b.iter(|| {
            engine.discard(&mut task).unwrap();
            task = engine
                .restore(&task.id, RestoreOptions::shallow())
                .unwrap();
            black_box(&task);
        });
    });
}

fn bench_naive_delete_recreate(c: &mut Criterion) {
    let store = NaiveCrudStore::new();
    let task = Task::new("naive");
    store.insert(task.clone());

    c.bench_function("naive_delete_recreate", |b| {
        b.iter(|| {
            let removed = store.remove(&task.id).unwrap();
            store.insert(black_box(removed));
        });
    });
}

fn bench_force_destroy_cascade(c: &mut Criterion) {
    let mut group = c.benchmark_group("force_destroy_cascade");
    for subtasks in [1usize, 10, 100] {
        group.throughput(Throughput::Elements(subtasks as u64 + 1));
        group.bench_with_input(
            BenchmarkId::from_parameter(subtasks),
            &subtasks,
            |b, &subtasks| {
                b.iter_batched(
                    || setup_cascade(subtasks),
                    |(engine, mut task)| {
                        engine.force_destroy(&mut task).unwrap();
                        black_box(task);
                    },
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_discard_restore_cycle,
    bench_naive_delete_recreate,
    bench_force_destroy_cascade
);
criterion_main!(benches);
