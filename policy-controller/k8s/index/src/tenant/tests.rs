use super::*;
use kubert::index::IndexClusterResource;
use maplit::btreeset;
use pretty_assertions::assert_eq;
use ahash::AHashSet as HashSet;
use tenancy_policy_controller_core::{Constraint, ContainerRegistries};
use tenancy_policy_controller_k8s_api::{
    AllowedRegistriesSpec, ObjectMeta, OwnerSpec, TenantSpec, TenantStatus,
};

fn mk_tenant(name: &str, namespaces: &[&str]) -> k8s::Tenant {
    k8s::Tenant {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            uid: Some(format!("{name}-uid")),
            ..Default::default()
        },
        spec: TenantSpec {
            owners: vec![],
            container_registries: None,
        },
        status: Some(TenantStatus {
            namespaces: namespaces.iter().map(|ns| ns.to_string()).collect(),
            size: namespaces.len() as u32,
        }),
    }
}

fn names(tenants: Vec<Arc<Tenant>>) -> Vec<String> {
    tenants.iter().map(|t| t.name.clone()).collect()
}

#[test]
fn resolves_namespaces_to_tenants() {
    let mut index = Index::default();
    index.apply(mk_tenant("awesome", &["awesome-ns", "awesome-dev"]));
    index.apply(mk_tenant("other", &["other-ns"]));

    assert_eq!(names(index.tenants_for_namespace("awesome-ns")), vec!["awesome"]);
    assert_eq!(names(index.tenants_for_namespace("awesome-dev")), vec!["awesome"]);
    assert_eq!(names(index.tenants_for_namespace("other-ns")), vec!["other"]);
    assert!(index.tenants_for_namespace("kube-system").is_empty());
    assert_eq!(index.len(), 2);
    assert_eq!(index.bound_namespaces(), 3);
}

#[test]
fn tenant_without_status_claims_nothing() {
    let mut index = Index::default();
    let mut tenant = mk_tenant("awesome", &[]);
    tenant.status = None;
    index.apply(tenant);

    assert_eq!(index.len(), 1);
    assert_eq!(index.bound_namespaces(), 0);
}

#[test]
fn binding_moves_with_status() {
    let mut index = Index::default();
    index.apply(mk_tenant("awesome", &["ns-a", "ns-b"]));
    index.apply(mk_tenant("awesome", &["ns-b", "ns-c"]));

    assert!(index.tenants_for_namespace("ns-a").is_empty());
    assert_eq!(names(index.tenants_for_namespace("ns-b")), vec!["awesome"]);
    assert_eq!(names(index.tenants_for_namespace("ns-c")), vec!["awesome"]);
    assert_eq!(index.bound_namespaces(), 2);
}

#[test]
fn delete_unbinds() {
    let mut index = Index::default();
    index.apply(mk_tenant("awesome", &["awesome-ns"]));
    index.apply(mk_tenant("other", &["other-ns"]));

    IndexClusterResource::<k8s::Tenant>::delete(&mut index, "awesome".to_string());
    assert!(index.tenants_for_namespace("awesome-ns").is_empty());
    assert!(index.get("awesome").is_none());
    assert_eq!(names(index.tenants_for_namespace("other-ns")), vec!["other"]);

    // Deleting an unknown tenant is a no-op.
    IndexClusterResource::<k8s::Tenant>::delete(&mut index, "missing".to_string());
    assert_eq!(index.len(), 1);
}

#[test]
fn conflicting_claims_are_ordered_by_name() {
    let mut index = Index::default();
    index.apply(mk_tenant("zeta", &["shared"]));
    index.apply(mk_tenant("alpha", &["shared", "alpha-ns"]));
    index.apply(mk_tenant("mid", &["shared"]));

    assert_eq!(
        names(index.tenants_for_namespace("shared")),
        vec!["alpha", "mid", "zeta"]
    );
    assert_eq!(index.conflicting_namespaces(), 1);

    IndexClusterResource::<k8s::Tenant>::delete(&mut index, "alpha".to_string());
    IndexClusterResource::<k8s::Tenant>::delete(&mut index, "mid".to_string());
    assert_eq!(names(index.tenants_for_namespace("shared")), vec!["zeta"]);
    assert_eq!(index.conflicting_namespaces(), 0);
}

#[test]
fn reset_drops_stale_tenants() {
    let mut index = Index::default();
    index.apply(mk_tenant("stale", &["stale-ns"]));
    index.apply(mk_tenant("awesome", &["awesome-ns"]));

    index.reset(
        vec![mk_tenant("awesome", &["awesome-ns", "new-ns"])],
        HashSet::from(["stale".to_string()]),
    );

    assert!(index.get("stale").is_none());
    assert!(index.tenants_for_namespace("stale-ns").is_empty());
    assert_eq!(names(index.tenants_for_namespace("new-ns")), vec!["awesome"]);
}

#[test]
fn converts_tenant_resources() {
    let mut resource = mk_tenant("awesome", &["awesome-ns"]);
    resource.spec = TenantSpec {
        owners: vec![
            OwnerSpec {
                kind: OwnerKind::User,
                name: "alice".to_string(),
            },
            OwnerSpec {
                kind: OwnerKind::Group,
                name: "platform".to_string(),
            },
            OwnerSpec {
                kind: OwnerKind::ServiceAccount,
                name: "system:serviceaccount:gitops-namespace:excluded-service-account"
                    .to_string(),
            },
        ],
        container_registries: Some(AllowedRegistriesSpec {
            allowed: vec!["docker.io".to_string()],
            allowed_patterns: vec![r"^.*\.internal\.example\.com$".to_string()],
        }),
    };

    let tenant = tenant_from_resource(resource);
    assert_eq!(tenant.name, "awesome");
    assert_eq!(tenant.uid.as_deref(), Some("awesome-uid"));
    assert_eq!(tenant.namespaces, btreeset! {"awesome-ns".to_string()});
    assert_eq!(
        tenant.owners,
        vec![
            Identity::user("alice"),
            Identity::group("platform"),
            Identity::service_account(
                "system:serviceaccount:gitops-namespace:excluded-service-account"
            ),
        ]
    );

    let allowed = tenant.container_registries.expect("registries must be set");
    assert!(allowed.matches("docker.io"));
    assert!(allowed.matches("registry.internal.example.com"));
    assert!(!allowed.matches("quay.io"));
}

#[test]
fn invalid_patterns_fail_closed() {
    let mut resource = mk_tenant("awesome", &["awesome-ns"]);
    resource.spec.container_registries = Some(AllowedRegistriesSpec {
        allowed: vec![],
        allowed_patterns: vec!["(quay".to_string()],
    });

    let tenant = tenant_from_resource(resource);
    let pod = mk_pod("quay.io/foo:latest");
    let violation = ContainerRegistries.check(&pod, &tenant);
    assert!(violation.is_some());
}

fn mk_pod(image: &str) -> k8s::Pod {
    k8s::Pod {
        metadata: ObjectMeta {
            name: Some("pod-0".to_string()),
            namespace: Some("awesome-ns".to_string()),
            ..Default::default()
        },
        spec: Some(k8s::PodSpec {
            containers: vec![k8s::Container {
                name: "app".to_string(),
                image: Some(image.to_string()),
                ..Default::default()
            }],
            ..Default::default()
        }),
        status: None,
    }
}
