//! Reusable demo wiring specs.
//!
//! Each function declares one complete wiring spec together with the roots
//! to instantiate.  The conformance tests build them and assert the exact
//! IR layout; the `loom` CLI builds them and prints the result.

use loom_plugins::{container, memstore, pool, process, rpc, service, testbundle};
use loom_wiring::WiringSpec;

/// A demo wiring spec and the roots to build it with.
pub struct Demo {
    /// The demo's name, as selected on the CLI.
    pub name: &'static str,
    /// One-line description of the topology.
    pub description: &'static str,
    /// The declared wiring spec.
    pub spec: WiringSpec,
    /// The roots to pass to `build_ir`.
    pub roots: Vec<String>,
}

impl Demo {
    /// The roots as borrowed strings, ready for `build_ir`.
    #[must_use]
    pub fn root_refs(&self) -> Vec<&str> {
        self.roots.iter().map(String::as_str).collect()
    }
}

/// Two services co-located in one process.
#[must_use]
pub fn colocated() -> Demo {
    let spec = WiringSpec::new("colocated");
    let leaf = service::define_service(&spec, "leaf", "Leaf", &[]);
    let nonleaf = service::define_service(&spec, "nonleaf", "NonLeaf", &[&leaf]);
    let myproc = process::create_process(&spec, "myproc", &[&leaf, &nonleaf]);
    Demo {
        name: "colocated",
        description: "two services in one process",
        spec,
        roots: vec![myproc],
    }
}

/// Two services in separate processes with no RPC between them.  Building
/// this fails with a reachability error.
#[must_use]
pub fn split_without_rpc() -> Demo {
    let spec = WiringSpec::new("split_without_rpc");
    let leaf = service::define_service(&spec, "leaf", "Leaf", &[]);
    let nonleaf = service::define_service(&spec, "nonleaf", "NonLeaf", &[&leaf]);
    let leaf_proc = process::create_process(&spec, "leaf_proc", &[&leaf]);
    let nonleaf_proc = process::create_process(&spec, "nonleaf_proc", &[&nonleaf]);
    Demo {
        name: "split-without-rpc",
        description: "two processes, no RPC: fails with a reachability error",
        spec,
        roots: vec![leaf_proc, nonleaf_proc],
    }
}

/// Two services in separate processes, with `leaf` deployed over RPC.
#[must_use]
pub fn split_with_rpc() -> Demo {
    let spec = WiringSpec::new("split_with_rpc");
    let leaf = service::define_service(&spec, "leaf", "Leaf", &[]);
    let nonleaf = service::define_service(&spec, "nonleaf", "NonLeaf", &[&leaf]);
    rpc::deploy(&spec, &leaf);
    let leaf_proc = process::create_process(&spec, "leaf_proc", &[&leaf]);
    let nonleaf_proc = process::create_process(&spec, "nonleaf_proc", &[&nonleaf]);
    Demo {
        name: "split-with-rpc",
        description: "two processes with leaf exposed over RPC",
        spec,
        roots: vec![leaf_proc, nonleaf_proc],
    }
}

/// [`split_with_rpc`] with a pool of seven clients around leaf's RPC client.
#[must_use]
pub fn pooled_clients() -> Demo {
    let spec = WiringSpec::new("pooled_clients");
    let leaf = service::define_service(&spec, "leaf", "Leaf", &[]);
    let nonleaf = service::define_service(&spec, "nonleaf", "NonLeaf", &[&leaf]);
    pool::create_pool(&spec, &leaf, 7);
    rpc::deploy(&spec, &leaf);
    let leaf_proc = process::create_process(&spec, "leaf_proc", &[&leaf]);
    let nonleaf_proc = process::create_process(&spec, "nonleaf_proc", &[&nonleaf]);
    Demo {
        name: "pooled-clients",
        description: "client pool of 7 wrapping leaf's RPC client",
        spec,
        roots: vec![leaf_proc, nonleaf_proc],
    }
}

/// Two services in separate processes sharing one in-memory cache.
/// Building this fails: the cache is unique application-wide.
#[must_use]
pub fn shared_cache() -> Demo {
    let spec = WiringSpec::new("shared_cache");
    let cache = memstore::cache(&spec, "shared_cache");
    let leaf = service::define_service(&spec, "leaf", "Leaf", &[&cache]);
    let nonleaf = service::define_service(&spec, "nonleaf", "NonLeaf", &[&cache]);
    let leaf_proc = process::create_process(&spec, "leaf_proc", &[&leaf]);
    let nonleaf_proc = process::create_process(&spec, "nonleaf_proc", &[&nonleaf]);
    Demo {
        name: "shared-cache",
        description: "one in-memory cache reached from two processes: fails",
        spec,
        roots: vec![leaf_proc, nonleaf_proc],
    }
}

/// RPC deployed before the pool was applied, so the pool has nothing to
/// wrap.  Building this fails at the pool's wiring line.
#[must_use]
pub fn rpc_before_pool() -> Demo {
    let spec = WiringSpec::new("rpc_before_pool");
    let leaf = service::define_service(&spec, "leaf", "Leaf", &[]);
    let nonleaf = service::define_service(&spec, "nonleaf", "NonLeaf", &[&leaf]);
    rpc::deploy(&spec, &leaf);
    pool::create_pool(&spec, &leaf, 7);
    let leaf_proc = process::create_process(&spec, "leaf_proc", &[&leaf]);
    let nonleaf_proc = process::create_process(&spec, "nonleaf_proc", &[&nonleaf]);
    Demo {
        name: "rpc-before-pool",
        description: "invalid modifier order: fails at the pool wiring line",
        spec,
        roots: vec![leaf_proc, nonleaf_proc],
    }
}

/// Both services deployed over RPC into processes inside containers.
#[must_use]
pub fn containers() -> Demo {
    let spec = WiringSpec::new("containers");
    let leaf = service::define_service(&spec, "leaf", "Leaf", &[]);
    let nonleaf = service::define_service(&spec, "nonleaf", "NonLeaf", &[&leaf]);
    rpc::deploy(&spec, &leaf);
    process::deploy(&spec, &leaf);
    let leaf_ctr = container::deploy(&spec, &leaf);
    rpc::deploy(&spec, &nonleaf);
    process::deploy(&spec, &nonleaf);
    let nonleaf_ctr = container::deploy(&spec, &nonleaf);
    Demo {
        name: "containers",
        description: "RPC-deployed services in processes inside containers",
        spec,
        roots: vec![leaf_ctr, nonleaf_ctr],
    }
}

/// A test bundle holding a client of an RPC-deployed service.
#[must_use]
pub fn bundle() -> Demo {
    let spec = WiringSpec::new("bundle");
    let leaf = service::define_service(&spec, "leaf", "Leaf", &[]);
    rpc::deploy(&spec, &leaf);
    let leaf_proc = process::deploy(&spec, &leaf);
    let tests = testbundle::test_bundle(&spec, &[&leaf]);
    Demo {
        name: "bundle",
        description: "test bundle with an injected client of leaf",
        spec,
        roots: vec![leaf_proc, tests],
    }
}

/// All demos, in presentation order.
#[must_use]
pub fn all() -> Vec<Demo> {
    vec![
        colocated(),
        split_without_rpc(),
        split_with_rpc(),
        pooled_clients(),
        shared_cache(),
        rpc_before_pool(),
        containers(),
        bundle(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_names_are_unique() {
        let mut names: Vec<&str> = all().iter().map(|demo| demo.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), all().len());
    }

    #[test]
    fn demos_declare_no_wiring_errors() {
        for demo in all() {
            assert!(
                demo.spec.err().is_none(),
                "demo {} accumulated declaration errors",
                demo.name
            );
        }
    }

    #[test]
    fn every_demo_has_roots() {
        for demo in all() {
            assert!(!demo.roots.is_empty(), "demo {} has no roots", demo.name);
        }
    }
}
