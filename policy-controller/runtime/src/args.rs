use crate::{
    admission::Admission,
    core::{
        Constraints, ContainerRegistries, Context, Dispatcher, GroupKind, Operation,
        TenantHandler, POLICY_CONTROLLER_NAME,
    },
    events::EventRecorder,
    index,
    k8s::{self, watcher},
    metrics::AdmissionMetrics,
    ExclusionsDiscover, TenantDiscover,
};
use anyhow::{bail, Result};
use clap::Parser;
use prometheus_client::registry::Registry;
use std::{sync::Arc, time::Duration};
use tracing::{info, info_span, Instrument};

#[derive(Debug, Parser)]
#[clap(name = "tenancy", about = "A tenant policy admission controller")]
pub struct Args {
    #[clap(
        long,
        default_value = "tenancy=info,warn",
        env = "TENANCY_POLICY_CONTROLLER_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    #[clap(flatten)]
    server: kubert::ServerArgs,

    #[clap(flatten)]
    admin: kubert::AdminArgs,

    /// Disables the admission controller server.
    #[clap(long)]
    admission_controller_disabled: bool,

    /// The name of the TenancyConfiguration that holds cluster exclusions.
    #[clap(long, default_value = "default")]
    configuration_name: String,

    /// The time allowed to decide a single admission request.
    #[clap(long, default_value = "10s", value_parser = parse_duration)]
    admission_timeout: Duration,

    /// The controller name reported on published events.
    #[clap(long, default_value = POLICY_CONTROLLER_NAME)]
    controller_name: String,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            admin,
            client,
            log_level,
            log_format,
            server,
            admission_controller_disabled,
            configuration_name,
            admission_timeout,
            controller_name,
        } = self;

        let server = if admission_controller_disabled {
            None
        } else {
            Some(server)
        };

        // Build the index data structures which will maintain the information
        // necessary for deciding admission requests.
        let tenant_index = index::tenant::Index::shared();
        let configuration_index = index::configuration::Index::shared(configuration_name.clone());

        let mut prom = <Registry>::default();
        index::tenant::metrics::register(
            prom.sub_registry_with_prefix("tenant_index"),
            tenant_index.clone(),
        );
        let admission_metrics =
            AdmissionMetrics::register(prom.sub_registry_with_prefix("admission"));
        let rt_metrics = kubert::RuntimeMetrics::register(prom.sub_registry_with_prefix("kube"));

        let mut runtime = kubert::Runtime::builder()
            .with_log(log_level, log_format)
            .with_metrics(rt_metrics)
            .with_admin(admin.into_builder().with_prometheus(prom))
            .with_client(client)
            .with_optional_server(server)
            .build()
            .await?;

        // Spawn resource watches.

        let tenants = runtime.watch_all::<k8s::Tenant>(watcher::Config::default());
        tokio::spawn(
            kubert::index::cluster(tenant_index.clone(), tenants).instrument(info_span!("tenants")),
        );

        let configurations = runtime.watch_all::<k8s::TenancyConfiguration>(
            watcher::Config::default().fields(&format!("metadata.name={configuration_name}")),
        );
        tokio::spawn(
            kubert::index::cluster(configuration_index.clone(), configurations)
                .instrument(info_span!("tenancyconfigurations")),
        );

        let events = EventRecorder::new(runtime.client(), controller_name);
        let cx = Context::new(
            TenantDiscover::new(tenant_index),
            ExclusionsDiscover::new(configuration_index),
            events,
        );

        // Pods are checked when created. Updates of pods that were already
        // admitted have no opinion.
        let pods = Constraints::<k8s::Pod>::on([Operation::Create]).push(ContainerRegistries);
        let dispatcher =
            Dispatcher::default().register(GroupKind::of::<k8s::Pod>(), TenantHandler::new(pods, cx));
        for kind in dispatcher.kinds() {
            info!(%kind, "Enforcing tenant policy");
        }

        let admission = Admission::new(Arc::new(dispatcher), admission_timeout, admission_metrics);
        let runtime = runtime.spawn_server(move || admission);

        // Block the main thread on the shutdown signal. Once it fires, wait for the background tasks to
        // complete before exiting.
        if runtime.run().await.is_err() {
            bail!("Aborted");
        }

        Ok(())
    }
}

/// Parses durations such as `500ms`, `10s` or `1m`.
fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    let (magnitude, unit) = s
        .find(|c: char| !c.is_ascii_digit())
        .map(|i| s.split_at(i))
        .unwrap_or((s, "s"));
    let magnitude = magnitude.parse::<u64>()?;
    match unit {
        "ms" => Ok(Duration::from_millis(magnitude)),
        "s" => Ok(Duration::from_secs(magnitude)),
        "m" => match magnitude.checked_mul(60) {
            Some(secs) => Ok(Duration::from_secs(secs)),
            None => bail!("duration {s:?} is too large"),
        },
        _ => bail!("invalid duration unit {unit:?}; expected ms, s or m"),
    }
}
