//! Scripted root shell and device properties for tests.

use crate::{
    Channel, ChannelError, PartitionLayout,
    gate::CapabilityGate,
    layout::{PROP_SDK, PROP_SLOT_SUFFIX, PROP_VIRTUAL_AB},
    operator::Operator,
    program::Deps,
    settings::Settings,
    shell::{Output, RootProvider, Shell},
    switcher::REBOOT_CMD,
};
use async_trait::async_trait;
use bon::bon;
use std::{
    collections::HashMap,
    io,
    sync::{Arc, Mutex},
    time::Duration,
};

/// Successful command printing `line`. An empty `line` prints nothing.
pub fn reply(line: &str) -> Output {
    Output {
        lines: if line.is_empty() {
            Vec::new()
        } else {
            vec![line.to_string()]
        },
        success: true,
    }
}

/// Command that exits with a non-zero status after printing `line`.
pub fn failure(line: &str) -> Output {
    Output {
        success: false,
        ..reply(line)
    }
}

#[derive(Debug, Clone)]
pub enum Reply {
    Output(Output),
    /// The shell dies while running the command.
    Broken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellEvent {
    Exec(String),
    Submit(String),
    Close,
}

#[derive(Debug, Default)]
struct LogInner {
    events: Vec<ShellEvent>,
    opens: usize,
}

/// Everything the fake shells were asked to do, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct ShellLog(Arc<Mutex<LogInner>>);

impl ShellLog {
    fn push(&self, event: ShellEvent) {
        self.0.lock().unwrap().events.push(event);
    }

    pub fn events(&self) -> Vec<ShellEvent> {
        self.0.lock().unwrap().events.clone()
    }

    /// Executed and submitted command lines, in order.
    pub fn commands(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ShellEvent::Exec(cmd) | ShellEvent::Submit(cmd) => Some(cmd),
                ShellEvent::Close => None,
            })
            .collect()
    }

    pub fn submitted(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ShellEvent::Submit(cmd) => Some(cmd),
                _ => None,
            })
            .collect()
    }

    pub fn close_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| **event == ShellEvent::Close)
            .count()
    }

    pub fn open_count(&self) -> usize {
        self.0.lock().unwrap().opens
    }
}

/// Answers commands from a fixed table. Unknown commands succeed silently.
#[derive(Debug)]
pub struct FakeShell {
    replies: Arc<HashMap<String, Reply>>,
    log: ShellLog,
}

impl FakeShell {
    pub fn new(replies: Vec<(&str, Output)>) -> (Self, ShellLog) {
        let log = ShellLog::default();
        let replies = replies
            .into_iter()
            .map(|(cmd, out)| (cmd.to_string(), Reply::Output(out)))
            .collect();
        let shell = Self {
            replies: Arc::new(replies),
            log: log.clone(),
        };

        (shell, log)
    }

    fn lookup(&self, cmd: &str) -> Result<Output, ChannelError> {
        match self.replies.get(cmd) {
            Some(Reply::Output(out)) => Ok(out.clone()),
            Some(Reply::Broken) => Err(ChannelError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "fake shell died",
            ))),
            None => Ok(reply("")),
        }
    }
}

#[async_trait]
impl Shell for FakeShell {
    async fn exec(&mut self, cmd: &str) -> Result<Output, ChannelError> {
        self.log.push(ShellEvent::Exec(cmd.to_string()));
        self.lookup(cmd)
    }

    async fn submit(&mut self, cmd: &str) -> Result<(), ChannelError> {
        self.log.push(ShellEvent::Submit(cmd.to_string()));
        self.lookup(cmd).map(|_| ())
    }

    async fn close(&mut self) {
        self.log.push(ShellEvent::Close);
    }
}

/// What happens when root is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    Granted,
    Denied,
    Unavailable,
    Timeout,
}

#[derive(Debug, Clone)]
pub struct FakeRoot {
    available: bool,
    grant: Grant,
    replies: Arc<HashMap<String, Reply>>,
    log: ShellLog,
}

#[async_trait]
impl RootProvider for FakeRoot {
    fn is_root_available(&self) -> bool {
        self.available
    }

    async fn open(&self) -> Result<Box<dyn Shell>, ChannelError> {
        self.log.0.lock().unwrap().opens += 1;
        match self.grant {
            Grant::Granted => Ok(Box::new(FakeShell {
                replies: Arc::clone(&self.replies),
                log: self.log.clone(),
            })),
            Grant::Denied => Err(ChannelError::RootDenied),
            Grant::Unavailable => Err(ChannelError::RootUnavailable),
            Grant::Timeout => Err(ChannelError::Timeout(Duration::from_secs(30))),
        }
    }
}

/// A Fixture that describes a device through its properties and the answers
/// its root shell gives. Defaults to a supported virtual A/B device on slot A.
pub struct Fixture {
    pub props: HashMap<String, String>,
    pub root: FakeRoot,
    pub log: ShellLog,
    pub settings: Settings,
}

#[bon]
impl Fixture {
    #[builder]
    pub fn new(
        #[builder(default = 30)] api_level: u32,
        #[builder(default = PartitionLayout::VirtualAB)] layout: PartitionLayout,
        #[builder(default = true)] root_available: bool,
        #[builder(default = Grant::Granted)] grant: Grant,
        #[builder(default = true)] bootctl_present: bool,
        #[builder(into, default = String::from("hal123"))] hal_info: String,
        #[builder(into, default = String::from("2"))] slot_count: String,
        #[builder(into, default = String::from("0"))] current_slot: String,
        #[builder(into)] suffix: Option<String>,
        #[builder(default = true)] set_active_succeeds: bool,
        #[builder(default = false)] reboot_breaks: bool,
    ) -> Fixture {
        let mut props = HashMap::from([(PROP_SDK.to_string(), api_level.to_string())]);
        match layout {
            PartitionLayout::ConventionalAB => {
                props.insert(PROP_SLOT_SUFFIX.to_string(), "_a".to_string());
            }
            PartitionLayout::VirtualAB => {
                props.insert(PROP_VIRTUAL_AB.to_string(), "true".to_string());
            }
            PartitionLayout::NonAB => {}
        }

        let suffix = suffix.unwrap_or_else(|| match current_slot.trim() {
            "1" => "_b".to_string(),
            _ => "_a".to_string(),
        });
        let set_active = if set_active_succeeds {
            reply("")
        } else {
            failure("Error setting active boot slot")
        };

        let mut replies = HashMap::from([
            (
                "command -v bootctl".to_string(),
                if bootctl_present {
                    reply("/system/bin/bootctl")
                } else {
                    failure("")
                },
            ),
            ("bootctl hal-info".to_string(), reply(&hal_info)),
            ("bootctl get-number-slots".to_string(), reply(&slot_count)),
            ("bootctl get-current-slot".to_string(), reply(&current_slot)),
            (
                format!("bootctl get-suffix {}", current_slot.trim()),
                reply(&suffix),
            ),
            ("bootctl set-active-boot-slot 0".to_string(), set_active.clone()),
            ("bootctl set-active-boot-slot 1".to_string(), set_active),
        ])
        .into_iter()
        .map(|(cmd, out)| (cmd, Reply::Output(out)))
        .collect::<HashMap<_, _>>();
        if reboot_breaks {
            replies.insert(REBOOT_CMD.to_string(), Reply::Broken);
        }

        let log = ShellLog::default();
        let root = FakeRoot {
            available: root_available,
            grant,
            replies: Arc::new(replies),
            log: log.clone(),
        };

        Self {
            props,
            root,
            log,
            settings: Settings::default(),
        }
    }

    /// Replaces the answer to `cmd`.
    pub fn with_reply(mut self, cmd: &str, reply: Reply) -> Self {
        let mut replies = (*self.root.replies).clone();
        replies.insert(cmd.to_string(), reply);
        self.root.replies = Arc::new(replies);
        self
    }

    pub fn deps(&self, operator: impl Operator + 'static) -> Deps {
        Deps::new(
            self.props.clone(),
            self.root.clone(),
            operator,
            self.settings.clone(),
        )
    }

    pub fn gate(&self) -> CapabilityGate<'_> {
        CapabilityGate::new(
            Arc::new(self.props.clone()),
            &self.root,
            &self.settings.bootctl,
        )
    }

    /// Opens a channel on the fake root, skipping the capability gate.
    pub async fn open_channel(&self) -> Channel {
        Channel::new(self.root.open().await.unwrap())
    }
}
