//! Static mapping tables from alert labels to platform components.
//!
//! The order of [`CORE_COMPONENTS`] and [`WORKLOAD_COMPONENTS`] is load
//! bearing: component ranks derive from the position of each entry.

/// Alerts that report node-level conditions. They map to the compute layer
/// regardless of the namespace that fires them.
pub static COMPUTE_ALERTS: &[&str] = &[
    // node lifecycle
    "KubeNodeNotReady",
    "KubeNodeReadinessFlapping",
    "KubeNodeUnreachable",
    "KubeletDown",
    "KubeletPlegDurationHigh",
    "KubeletPodStartUpLatencyHigh",
    "KubeletTooManyPods",
    "NodeWithoutOVNKubeNodePodRunning",
    // node-exporter
    "NodeClockNotSynchronising",
    "NodeClockSkewDetected",
    "NodeFileDescriptorLimit",
    "NodeFilesystemAlmostOutOfFiles",
    "NodeFilesystemAlmostOutOfSpace",
    "NodeFilesystemFilesFillingUp",
    "NodeFilesystemSpaceFillingUp",
    "NodeHighNumberConntrackEntriesUsed",
    "NodeMemoryMajorPagesFaults",
    "NodeNetworkReceiveErrs",
    "NodeNetworkTransmitErrs",
    "NodeRAIDDegraded",
    "NodeRAIDDiskFailure",
    "NodeSystemSaturation",
    "NodeSystemdServiceFailed",
    "NodeTextFileCollectorScrapeError",
    // machine-config daemon
    "MCDDrainError",
    "MCDPivotError",
    "MCDRebootError",
    "SystemMemoryExceedsReservation",
];

/// One declarative rule of the core or workload tables: the rule wins when
/// the alert's namespace is listed or, for a few components, when the alert
/// name itself is listed.
pub struct ComponentRule {
    pub component: &'static str,
    pub namespaces: &'static [&'static str],
    pub alert_names: &'static [&'static str],
}

pub static CORE_COMPONENTS: &[ComponentRule] = &[
    ComponentRule {
        component: "etcd",
        namespaces: &["openshift-etcd", "openshift-etcd-operator"],
        alert_names: &[],
    },
    ComponentRule {
        component: "kube-apiserver",
        namespaces: &[
            "openshift-kube-apiserver",
            "openshift-kube-apiserver-operator",
        ],
        alert_names: &[],
    },
    ComponentRule {
        component: "kube-controller-manager",
        namespaces: &[
            "openshift-kube-controller-manager",
            "openshift-kube-controller-manager-operator",
        ],
        alert_names: &[],
    },
    ComponentRule {
        component: "kube-scheduler",
        namespaces: &[
            "openshift-kube-scheduler",
            "openshift-kube-scheduler-operator",
        ],
        alert_names: &[],
    },
    ComponentRule {
        component: "apiserver",
        namespaces: &[
            "openshift-apiserver",
            "openshift-apiserver-operator",
            "openshift-oauth-apiserver",
        ],
        alert_names: &[],
    },
    ComponentRule {
        component: "version",
        namespaces: &["openshift-cluster-version"],
        alert_names: &["ClusterNotUpgradeable", "UpdateAvailable"],
    },
    ComponentRule {
        component: "machine-config",
        namespaces: &["openshift-machine-config-operator"],
        alert_names: &[],
    },
    ComponentRule {
        component: "machine-api",
        namespaces: &["openshift-machine-api"],
        alert_names: &[],
    },
    ComponentRule {
        component: "cloud-controller-manager",
        namespaces: &[
            "openshift-cloud-controller-manager",
            "openshift-cloud-controller-manager-operator",
        ],
        alert_names: &[],
    },
    ComponentRule {
        component: "cloud-credential",
        namespaces: &["openshift-cloud-credential-operator"],
        alert_names: &[],
    },
    ComponentRule {
        component: "cluster-autoscaler",
        namespaces: &["openshift-cluster-autoscaler"],
        alert_names: &[],
    },
    ComponentRule {
        component: "monitoring",
        namespaces: &["openshift-monitoring", "openshift-user-workload-monitoring"],
        alert_names: &["Watchdog", "AlertmanagerReceiversNotConfigured"],
    },
    ComponentRule {
        component: "network",
        namespaces: &[
            "openshift-sdn",
            "openshift-ovn-kubernetes",
            "openshift-network-operator",
            "openshift-network-diagnostics",
            "openshift-multus",
            "openshift-host-network",
        ],
        alert_names: &[],
    },
    ComponentRule {
        component: "dns",
        namespaces: &["openshift-dns", "openshift-dns-operator"],
        alert_names: &[],
    },
    ComponentRule {
        component: "ingress",
        namespaces: &[
            "openshift-ingress",
            "openshift-ingress-operator",
            "openshift-ingress-canary",
        ],
        alert_names: &[],
    },
    ComponentRule {
        component: "console",
        namespaces: &["openshift-console", "openshift-console-operator"],
        alert_names: &[],
    },
    ComponentRule {
        component: "authentication",
        namespaces: &[
            "openshift-authentication",
            "openshift-authentication-operator",
        ],
        alert_names: &[],
    },
    ComponentRule {
        component: "image-registry",
        namespaces: &["openshift-image-registry"],
        alert_names: &[],
    },
    ComponentRule {
        component: "storage",
        namespaces: &[
            "openshift-cluster-csi-drivers",
            "openshift-cluster-storage-operator",
        ],
        alert_names: &[],
    },
    ComponentRule {
        component: "operator-lifecycle-manager",
        namespaces: &[
            "openshift-operator-lifecycle-manager",
            "openshift-marketplace",
        ],
        alert_names: &[],
    },
    ComponentRule {
        component: "service-ca",
        namespaces: &["openshift-service-ca", "openshift-service-ca-operator"],
        alert_names: &[],
    },
    ComponentRule {
        component: "insights",
        namespaces: &["openshift-insights"],
        alert_names: &["InsightsDisabled", "SimpleContentAccessNotAvailable"],
    },
    ComponentRule {
        component: "node-tuning",
        namespaces: &["openshift-cluster-node-tuning-operator"],
        alert_names: &[],
    },
    ComponentRule {
        component: "samples",
        namespaces: &["openshift-cluster-samples-operator"],
        alert_names: &[],
    },
    ComponentRule {
        component: "kube-storage-version-migrator",
        namespaces: &[
            "openshift-kube-storage-version-migrator",
            "openshift-kube-storage-version-migrator-operator",
        ],
        alert_names: &[],
    },
];

/// Workload rules extend the declarative table with one alert-name pattern
/// rule and one multi-key conjunction rule.
pub enum WorkloadRule {
    Namespaces {
        component: &'static str,
        namespaces: &'static [&'static str],
    },
    AlertNamePattern {
        component: &'static str,
        pattern: &'static str,
    },
    LabelConjunction {
        component: &'static str,
        labels: &'static [(&'static str, &'static str)],
    },
}

impl WorkloadRule {
    pub fn component(&self) -> &'static str {
        match self {
            WorkloadRule::Namespaces { component, .. }
            | WorkloadRule::AlertNamePattern { component, .. }
            | WorkloadRule::LabelConjunction { component, .. } => *component,
        }
    }
}

pub static WORKLOAD_COMPONENTS: &[WorkloadRule] = &[
    WorkloadRule::Namespaces {
        component: "logging",
        namespaces: &["openshift-logging", "openshift-operators-redhat"],
    },
    WorkloadRule::AlertNamePattern {
        component: "Argo",
        pattern: "^Argo",
    },
    WorkloadRule::Namespaces {
        component: "gitops",
        namespaces: &["openshift-gitops", "openshift-gitops-operator"],
    },
    WorkloadRule::Namespaces {
        component: "pipelines",
        namespaces: &["openshift-pipelines"],
    },
    WorkloadRule::Namespaces {
        component: "serverless",
        namespaces: &["openshift-serverless"],
    },
    WorkloadRule::Namespaces {
        component: "service-mesh",
        namespaces: &["openshift-istio-system", "istio-system"],
    },
    WorkloadRule::LabelConjunction {
        component: "kubevirt",
        labels: &[
            ("kubernetes_operator_part_of", "kubevirt"),
            ("namespace", "openshift-cnv"),
        ],
    },
    WorkloadRule::Namespaces {
        component: "odf",
        namespaces: &["openshift-storage"],
    },
    WorkloadRule::Namespaces {
        component: "acm",
        namespaces: &[
            "open-cluster-management",
            "open-cluster-management-hub",
            "open-cluster-management-agent",
        ],
    },
    WorkloadRule::Namespaces {
        component: "quay",
        namespaces: &["openshift-quay"],
    },
    WorkloadRule::Namespaces {
        component: "oadp",
        namespaces: &["openshift-adp"],
    },
    WorkloadRule::Namespaces {
        component: "local-storage",
        namespaces: &["openshift-local-storage"],
    },
];
