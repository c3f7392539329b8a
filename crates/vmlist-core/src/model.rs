use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PowerState {
    Halted,
    Running,
    Suspended,
    Paused,
}

impl PowerState {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Halted" => Some(Self::Halted),
            "Running" => Some(Self::Running),
            "Suspended" => Some(Self::Suspended),
            "Paused" => Some(Self::Paused),
            _ => None,
        }
    }
}

macro_rules! action_kinds {
    ($($variant:ident => $wire:literal),+ $(,)?) => {
        /// Operations the remote side may permit on a single entity.
        #[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum ActionKind {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl ActionKind {
            pub const VALUES: &'static [ActionKind] = &[$(ActionKind::$variant),+];

            pub fn as_wire(&self) -> &'static str {
                match self {
                    $(ActionKind::$variant => $wire,)+
                }
            }

            pub fn from_wire(s: &str) -> Option<Self> {
                match s {
                    $($wire => Some(ActionKind::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

action_kinds! {
    AttachVdi => "attach_vdi",
    AttachNetwork => "attach_network",
    Rename => "rename",
    ChangeDomainType => "change_domain_type",
    Vnc => "VNC",
    LaunchPlaybook => "launch_playbook",
    ChangingVcpus => "changing_VCPUs",
    ChangingMemoryLimits => "changing_memory_limits",
    Snapshot => "snapshot",
    Clone => "clone",
    Copy => "copy",
    CreateTemplate => "create_template",
    Revert => "revert",
    Checkpoint => "checkpoint",
    SnapshotWithQuiesce => "snapshot_with_quiesce",
    Start => "start",
    StartOn => "start_on",
    Pause => "pause",
    Unpause => "unpause",
    CleanShutdown => "clean_shutdown",
    CleanReboot => "clean_reboot",
    HardShutdown => "hard_shutdown",
    PowerStateReset => "power_state_reset",
    HardReboot => "hard_reboot",
    Suspend => "suspend",
    Csvm => "csvm",
    Resume => "resume",
    ResumeOn => "resume_on",
    PoolMigrate => "pool_migrate",
    MigrateSend => "migrate_send",
    Shutdown => "shutdown",
    Destroy => "destroy",
    All => "ALL",
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Notification kinds delivered by the list subscription.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    Add,
    Remove,
    Change,
}

/// User-facing bulk actions. Each one reads exactly one eligibility set.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BulkAction {
    Start,
    Stop,
    Pause,
    Suspend,
    Destroy,
}

impl BulkAction {
    pub const ALL: [BulkAction; 5] = [
        BulkAction::Start,
        BulkAction::Stop,
        BulkAction::Pause,
        BulkAction::Suspend,
        BulkAction::Destroy,
    ];

    /// Verb used in button titles.
    pub fn verb(&self) -> &'static str {
        match self {
            BulkAction::Start => "Start",
            BulkAction::Stop => "Stop",
            BulkAction::Pause => "Pause",
            BulkAction::Suspend => "Suspend",
            BulkAction::Destroy => "Delete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" => Some(BulkAction::Start),
            "stop" => Some(BulkAction::Stop),
            "pause" => Some(BulkAction::Pause),
            "suspend" => Some(BulkAction::Suspend),
            "destroy" | "delete" => Some(BulkAction::Destroy),
            _ => None,
        }
    }
}

impl fmt::Display for BulkAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BulkAction::Start => "start",
            BulkAction::Stop => "stop",
            BulkAction::Pause => "pause",
            BulkAction::Suspend => "suspend",
            BulkAction::Destroy => "destroy",
        })
    }
}
