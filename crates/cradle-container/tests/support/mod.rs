//! In-memory fakes for the container core's collaborators.

#![allow(dead_code)]
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use cradle_common::config::CradleConfig;
use cradle_common::error::{CradleError, Result};
use cradle_common::types::{ContainerId, ContainerState, LayerId};
use cradle_container::container::ContainerRuntimeState;
use cradle_container::services::{ContainerStatus, ProcessRuntime, Services, StateStore};
use cradle_storage::service::{
    ContainerDirs, ContainerStorageRecord, ImageContext, Layer, StorageService,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Storage engine backed by real directories under a temp root.
pub struct FakeStorage {
    root: PathBuf,
    run_root: Mutex<PathBuf>,
    records: Mutex<HashMap<ContainerId, ContainerStorageRecord>>,
    layers: Mutex<HashMap<LayerId, Layer>>,
    diff_sizes: Mutex<HashMap<(Option<LayerId>, LayerId), u64>>,
    mounted: Mutex<HashSet<ContainerId>>,
    pub deleted: Mutex<HashSet<ContainerId>>,
    pub mount_calls: AtomicUsize,
    pub unmount_calls: AtomicUsize,
    fail_unmounts: AtomicBool,
}

impl FakeStorage {
    pub fn new(root: PathBuf) -> Self {
        let run_root = root.join("run");
        Self {
            root,
            run_root: Mutex::new(run_root),
            records: Mutex::new(HashMap::new()),
            layers: Mutex::new(HashMap::new()),
            diff_sizes: Mutex::new(HashMap::new()),
            mounted: Mutex::new(HashSet::new()),
            deleted: Mutex::new(HashSet::new()),
            mount_calls: AtomicUsize::new(0),
            unmount_calls: AtomicUsize::new(0),
            fail_unmounts: AtomicBool::new(false),
        }
    }

    /// Makes every image unmount fail, as a busy mount would.
    pub fn fail_unmounts(&self, fail: bool) {
        self.fail_unmounts.store(fail, Ordering::SeqCst);
    }

    pub fn mountpoint_path(&self, id: &ContainerId) -> PathBuf {
        self.root.join(id.as_str()).join("merged")
    }

    /// Simulates the run directory moving, as it does across a reboot.
    pub fn set_run_root(&self, run_root: PathBuf) {
        *self.run_root.lock().expect("run_root lock") = run_root;
    }

    pub fn set_record(&self, id: &ContainerId, layer_id: LayerId) {
        let _ = self
            .records
            .lock()
            .expect("records lock")
            .insert(id.clone(), ContainerStorageRecord { layer_id });
    }

    pub fn add_layer(&self, id: &LayerId, parent: Option<&LayerId>) {
        let _ = self.layers.lock().expect("layers lock").insert(
            id.clone(),
            Layer {
                id: id.clone(),
                parent: parent.cloned(),
            },
        );
    }

    pub fn set_diff_size(&self, parent: Option<&LayerId>, layer: &LayerId, size: u64) {
        let _ = self
            .diff_sizes
            .lock()
            .expect("diff_sizes lock")
            .insert((parent.cloned(), layer.clone()), size);
    }

    pub fn is_image_mounted(&self, id: &ContainerId) -> bool {
        self.mounted.lock().expect("mounted lock").contains(id)
    }
}

impl StorageService for FakeStorage {
    fn create_container_storage(
        &self,
        _ctx: &ImageContext,
        _image_name: &str,
        _image_id: &str,
        _container_name: &str,
        container_id: &ContainerId,
        _mount_label: &str,
    ) -> Result<ContainerDirs> {
        let bundle_dir = self.root.join(container_id.as_str()).join("userdata");
        let run_dir = self
            .run_root
            .lock()
            .expect("run_root lock")
            .join(container_id.as_str());
        std::fs::create_dir_all(&bundle_dir).expect("create bundle dir");
        std::fs::create_dir_all(&run_dir).expect("create run dir");
        Ok(ContainerDirs {
            bundle_dir,
            run_dir,
        })
    }

    fn mount_container_image(&self, id: &ContainerId) -> Result<PathBuf> {
        let _ = self.mount_calls.fetch_add(1, Ordering::SeqCst);
        let mountpoint = self.mountpoint_path(id);
        std::fs::create_dir_all(&mountpoint).expect("create mountpoint");
        let _ = self.mounted.lock().expect("mounted lock").insert(id.clone());
        Ok(mountpoint)
    }

    fn unmount_container_image(&self, id: &ContainerId) -> Result<()> {
        let _ = self.unmount_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_unmounts.load(Ordering::SeqCst) {
            return Err(CradleError::Mount {
                path: self.mountpoint_path(id),
                message: "device or resource busy".into(),
            });
        }
        let _ = self.mounted.lock().expect("mounted lock").remove(id);
        Ok(())
    }

    fn delete_container(&self, id: &ContainerId) -> Result<()> {
        let _ = self.deleted.lock().expect("deleted lock").insert(id.clone());
        let _ = self.records.lock().expect("records lock").remove(id);
        Ok(())
    }

    fn run_dir(&self, id: &ContainerId) -> Result<PathBuf> {
        let run_dir = self
            .run_root
            .lock()
            .expect("run_root lock")
            .join(id.as_str());
        std::fs::create_dir_all(&run_dir).expect("create run dir");
        Ok(run_dir)
    }

    fn container_record(&self, id: &ContainerId) -> Result<ContainerStorageRecord> {
        self.records
            .lock()
            .expect("records lock")
            .get(id)
            .cloned()
            .ok_or_else(|| CradleError::NotFound {
                kind: "container",
                id: id.to_string(),
            })
    }

    fn layer(&self, id: &LayerId) -> Result<Layer> {
        self.layers
            .lock()
            .expect("layers lock")
            .get(id)
            .cloned()
            .ok_or_else(|| CradleError::NotFound {
                kind: "layer",
                id: id.to_string(),
            })
    }

    fn diff_size(&self, parent: Option<&LayerId>, layer: &LayerId) -> Result<u64> {
        self.diff_sizes
            .lock()
            .expect("diff_sizes lock")
            .get(&(parent.cloned(), layer.clone()))
            .copied()
            .ok_or_else(|| CradleError::NotFound {
                kind: "layer diff",
                id: layer.to_string(),
            })
    }
}

/// State store keeping records as JSON, like the real one would on disk.
pub struct FakeStateStore {
    records: Mutex<HashMap<ContainerId, String>>,
    pub save_calls: AtomicUsize,
    fail_saves: AtomicBool,
}

impl FakeStateStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            save_calls: AtomicUsize::new(0),
            fail_saves: AtomicBool::new(false),
        }
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Simulates another process removing the container.
    pub fn remove(&self, id: &ContainerId) {
        let _ = self.records.lock().expect("records lock").remove(id);
    }

    pub fn persisted_state(&self, id: &ContainerId) -> Option<ContainerRuntimeState> {
        self.records
            .lock()
            .expect("records lock")
            .get(id)
            .map(|json| serde_json::from_str(json).expect("deserialize state"))
    }
}

impl StateStore for FakeStateStore {
    fn save_container(&self, id: &ContainerId, state: &ContainerRuntimeState) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(CradleError::Persistence {
                id: id.to_string(),
                message: "state store is read-only".into(),
            });
        }
        let json = serde_json::to_string(state)?;
        let _ = self
            .records
            .lock()
            .expect("records lock")
            .insert(id.clone(), json);
        let _ = self.save_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn update_container(&self, id: &ContainerId) -> Result<Option<ContainerRuntimeState>> {
        match self.records.lock().expect("records lock").get(id) {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }
}

/// Process runtime reporting a scripted status.
pub struct FakeRuntime {
    status: Mutex<ContainerStatus>,
    sockets: PathBuf,
}

impl FakeRuntime {
    pub fn new(sockets: PathBuf) -> Self {
        Self {
            status: Mutex::new(ContainerStatus {
                state: ContainerState::Unknown,
                pid: None,
                exit_code: None,
                finished_at: None,
            }),
            sockets,
        }
    }

    pub fn set_status(&self, status: ContainerStatus) {
        *self.status.lock().expect("status lock") = status;
    }
}

impl ProcessRuntime for FakeRuntime {
    fn container_status(&self, _id: &ContainerId) -> Result<ContainerStatus> {
        Ok(self.status.lock().expect("status lock").clone())
    }

    fn sockets_dir(&self) -> PathBuf {
        self.sockets.clone()
    }
}

/// One temp-dir-backed environment: config, fakes, and the service
/// bundle wired over them.
pub struct Fixture {
    pub storage: Arc<FakeStorage>,
    pub state: Arc<FakeStateStore>,
    pub runtime: Arc<FakeRuntime>,
    pub services: Services,
    pub config: CradleConfig,
    _dir: tempfile::TempDir,
}

pub fn fixture() -> Fixture {
    init_tracing();
    let dir = tempfile::tempdir().expect("tempdir");

    let storage = Arc::new(FakeStorage::new(dir.path().join("storage")));
    let state = Arc::new(FakeStateStore::new());
    let runtime = Arc::new(FakeRuntime::new(dir.path().join("sockets")));

    let services = Services {
        storage: Arc::clone(&storage) as Arc<dyn StorageService>,
        state: Arc::clone(&state) as Arc<dyn StateStore>,
        oci: Arc::clone(&runtime) as Arc<dyn ProcessRuntime>,
        image_context: ImageContext::default(),
    };
    let config = CradleConfig {
        data_dir: dir.path().join("data"),
        lock_dir: dir.path().join("locks"),
        ..CradleConfig::default()
    };

    Fixture {
        storage,
        state,
        runtime,
        services,
        config,
        _dir: dir,
    }
}
