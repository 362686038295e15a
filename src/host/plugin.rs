//! The plugin object behind the host method channel.
//!
//! Every call is decoded into an [`Invocation`] first; only a fully validated
//! invocation touches the dispatcher, registry or schedulers, so a rejected
//! call never leaves partial state behind.

use super::contract::{ErrorBody, ErrorCode, MethodName};
use crate::config::{NotifierConfig, PollingConfig};
use crate::delivery::{
    ChannelSpec, Content, DeliveryDispatcher, Notification, NotificationAction, Priority,
};
use crate::error::NotifyError;
use crate::feed::{FeedParser, FeedSource};
use crate::platform::{ImageLoader, JobHost, NotificationRenderer};
use crate::registry::{ActiveService, ServiceRegistry};
use crate::scheduler::{FeedCycle, ForegroundSession, PeriodicPoller};
use crate::store::{KeyValueStore, PollingSettings};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Capabilities the embedding host provides.
pub struct HostCapabilities {
    pub renderer: Arc<dyn NotificationRenderer>,
    pub images: Arc<dyn ImageLoader>,
    pub feed: Arc<dyn FeedSource>,
    pub jobs: Arc<dyn JobHost>,
    pub store: Arc<dyn KeyValueStore>,
}

/// Something that answers method calls by name.
pub trait MethodHandler: Send + Sync + 'static {
    fn handle(&self, method: &str, args: &Value) -> Result<Value, ErrorBody>;

    /// Active notification service, reported in service-change events.
    fn active_service(&self) -> Option<ActiveService> {
        None
    }
}

impl<H: MethodHandler + ?Sized> MethodHandler for Arc<H> {
    fn handle(&self, method: &str, args: &Value) -> Result<Value, ErrorBody> {
        (**self).handle(method, args)
    }

    fn active_service(&self) -> Option<ActiveService> {
        (**self).active_service()
    }
}

/// A validated method call.
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    PlatformVersion,
    RequestPermission,
    CheckPermission,
    Show(Notification),
    CreateChannel(ChannelSpec),
    StartPolling(PollingConfig),
    StopPolling,
    StartForeground {
        config: PollingConfig,
        channel_id: Option<String>,
    },
    StopForeground,
    UseExternalPush,
    GetActiveService,
}

impl Invocation {
    /// Decode the arguments of `method`.
    ///
    /// `default_interval` fills a missing `intervalMinutes`.
    pub fn parse(method: MethodName, args: &Value, default_interval: u32) -> Result<Self, ErrorBody> {
        let args = Args::new(args)?;
        let invocation = match method {
            MethodName::GetPlatformVersion => Self::PlatformVersion,
            MethodName::RequestNotificationPermission => Self::RequestPermission,
            MethodName::CheckNotificationPermission => Self::CheckPermission,
            MethodName::ShowNotification => Self::Show(args.notification(Content::Plain)?),
            MethodName::ShowBigTextNotification => {
                let big_text = args.string("bigText")?;
                let mut notification = args.notification(Content::Plain)?;
                let text = big_text.unwrap_or_else(|| notification.message.clone());
                notification.content = Content::BigText(text);
                Self::Show(notification)
            }
            MethodName::ShowImageNotification => {
                let url = args.non_empty(
                    "imageUrl",
                    ErrorCode::InvalidUrl,
                    "Image URL cannot be null or empty",
                )?;
                Self::Show(args.notification(Content::Image(url))?)
            }
            MethodName::ShowNotificationWithActions => {
                let actions = args.actions()?;
                Self::Show(args.notification(Content::Actions(actions))?)
            }
            MethodName::CreateCustomChannel => Self::CreateChannel(args.channel()?),
            MethodName::StartNotificationPolling => {
                Self::StartPolling(args.polling_config(default_interval)?)
            }
            MethodName::StopNotificationPolling => Self::StopPolling,
            MethodName::StartForegroundService => Self::StartForeground {
                config: args.polling_config(default_interval)?,
                channel_id: args.string("channelId")?,
            },
            MethodName::StopForegroundService => Self::StopForeground,
            MethodName::SetFirebaseAsActiveService => Self::UseExternalPush,
            MethodName::GetActiveNotificationService => Self::GetActiveService,
        };
        Ok(invocation)
    }
}

/// Typed access to a loosely-typed argument map.
struct Args<'a> {
    map: Option<&'a Map<String, Value>>,
}

impl<'a> Args<'a> {
    fn new(args: &'a Value) -> Result<Self, ErrorBody> {
        match args {
            Value::Null => Ok(Self { map: None }),
            Value::Object(map) => Ok(Self { map: Some(map) }),
            other => Err(invalid_argument(format!(
                "arguments must be an object, got {other}"
            ))),
        }
    }

    fn get(&self, field: &str) -> Option<&'a Value> {
        self.map
            .and_then(|map| map.get(field))
            .filter(|value| !value.is_null())
    }

    fn string(&self, field: &str) -> Result<Option<String>, ErrorBody> {
        match self.get(field) {
            None => Ok(None),
            Some(Value::String(raw)) => Ok(Some(raw.clone())),
            Some(_) => Err(invalid_argument(format!("`{field}` must be a string"))),
        }
    }

    fn int(&self, field: &str) -> Result<Option<i64>, ErrorBody> {
        match self.get(field) {
            None => Ok(None),
            Some(value) => value
                .as_i64()
                .map(Some)
                .ok_or_else(|| invalid_argument(format!("`{field}` must be an integer"))),
        }
    }

    fn flag(&self, field: &str, default: bool) -> Result<bool, ErrorBody> {
        match self.get(field) {
            None => Ok(default),
            Some(Value::Bool(value)) => Ok(*value),
            Some(_) => Err(invalid_argument(format!("`{field}` must be a boolean"))),
        }
    }

    /// A mandatory string; missing, non-string or blank all map to `code`.
    fn non_empty(&self, field: &str, code: ErrorCode, message: &str) -> Result<String, ErrorBody> {
        match self.get(field) {
            Some(Value::String(raw)) if !raw.trim().is_empty() => Ok(raw.trim().to_owned()),
            _ => Err(ErrorBody::new(code, message)),
        }
    }

    fn notification(&self, content: Content) -> Result<Notification, ErrorBody> {
        let id = self
            .int("id")?
            .map(|raw| {
                i32::try_from(raw)
                    .map_err(|_| invalid_argument(format!("`id` {raw} is out of range")))
            })
            .transpose()?;
        let title = self.string("title")?.unwrap_or_else(|| "Notification".to_owned());
        let message = self.string("message")?.unwrap_or_default();

        let mut notification = Notification::new(title, message)
            .with_channel(self.string("channelId")?)
            .with_content(content);
        notification.id = id;
        notification.priority = self
            .int("priority")?
            .map_or(Priority::Default, Priority::from_code);
        notification.auto_cancel = self.flag("autoCancel", true)?;
        Ok(notification)
    }

    fn actions(&self) -> Result<Vec<NotificationAction>, ErrorBody> {
        let invalid = || ErrorBody::new(ErrorCode::InvalidActions, "Actions cannot be null or empty");
        let raw = self.get("actions").ok_or_else(invalid)?;
        let actions: Vec<NotificationAction> =
            serde_json::from_value(raw.clone()).map_err(|_| invalid())?;
        if actions.is_empty() {
            return Err(invalid());
        }
        Ok(actions)
    }

    fn channel(&self) -> Result<ChannelSpec, ErrorBody> {
        let message = "Channel ID and name cannot be null or empty";
        let id = self.non_empty("channelId", ErrorCode::InvalidChannel, message)?;
        let name = self.non_empty("channelName", ErrorCode::InvalidChannel, message)?;

        let mut spec =
            ChannelSpec::from_importance_code(id, name, self.int("importance")?.unwrap_or(0));
        if let Some(description) = self.string("channelDescription")? {
            spec = spec.with_description(description);
        }
        let color = self.int("lightColor")?.map(argb_color).transpose()?;
        let sound = spec.sound && self.flag("enableSound", true)?;
        Ok(spec
            .with_lights(self.flag("enableLights", true)?, color)
            .with_vibration(self.flag("enableVibration", true)?)
            .with_sound(sound))
    }

    fn polling_config(&self, default_interval: u32) -> Result<PollingConfig, ErrorBody> {
        let url = self.non_empty(
            "pollingUrl",
            ErrorCode::InvalidUrl,
            "Polling URL cannot be null or empty",
        )?;
        let interval = match self.int("intervalMinutes")? {
            None => default_interval,
            Some(raw) => u32::try_from(raw)
                .map_err(|_| invalid_argument("intervalMinutes must be a positive integer"))?,
        };
        PollingConfig::new(&url, Some(interval)).map_err(|e| to_body(e, ErrorCode::InvalidArgument))
    }
}

/// Colors arrive either as unsigned ARGB or as the signed 32-bit form.
fn argb_color(raw: i64) -> Result<u32, ErrorBody> {
    if let Ok(color) = u32::try_from(raw) {
        return Ok(color);
    }
    i32::try_from(raw)
        .map(|signed| u32::from_be_bytes(signed.to_be_bytes()))
        .map_err(|_| invalid_argument(format!("`lightColor` {raw} is not a 32-bit color")))
}

fn invalid_argument(message: impl Into<String>) -> ErrorBody {
    ErrorBody::new(ErrorCode::InvalidArgument, message)
}

/// Keep the code of validation errors; everything else gets `fallback`.
fn to_body(error: NotifyError, fallback: ErrorCode) -> ErrorBody {
    match error {
        NotifyError::InvalidArgument { code, message } => ErrorBody::new(code, message),
        other => ErrorBody::new(fallback, other.to_string()),
    }
}

/// Wires the notification subsystem together and answers host calls.
pub struct NotificationPlugin {
    dispatcher: Arc<DeliveryDispatcher>,
    registry: Arc<ServiceRegistry>,
    poller: Arc<PeriodicPoller>,
    session: Arc<ForegroundSession>,
    default_interval: u32,
}

impl NotificationPlugin {
    #[must_use]
    pub fn new(config: &NotifierConfig, host: HostCapabilities) -> Self {
        let settings = PollingSettings::new(host.store);
        let registry = Arc::new(ServiceRegistry::new(settings.clone()));
        let dispatcher = Arc::new(DeliveryDispatcher::new(
            Arc::clone(&host.renderer),
            host.images,
        ));
        let cycle = Arc::new(FeedCycle::new(
            host.feed,
            FeedParser::from_config(&config.feed),
            Arc::clone(&dispatcher),
        ));
        let poller = PeriodicPoller::new(
            host.jobs,
            Arc::clone(&registry),
            settings.clone(),
            Arc::clone(&cycle),
            config.polling.clone(),
        );
        let session = ForegroundSession::new(
            Arc::clone(&registry),
            settings,
            cycle,
            host.renderer,
            config.foreground.clone(),
        );
        Self {
            dispatcher,
            registry,
            poller,
            session,
            default_interval: config.polling.default_interval_minutes,
        }
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Arc<DeliveryDispatcher> {
        &self.dispatcher
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn poller(&self) -> &Arc<PeriodicPoller> {
        &self.poller
    }

    #[must_use]
    pub fn session(&self) -> &Arc<ForegroundSession> {
        &self.session
    }

    /// Resume whichever polling mechanism was active before the process stopped.
    ///
    /// Failures are logged; a broken restore must not keep the host from starting.
    pub fn restore(&self) -> ActiveService {
        match self.poller.restore() {
            Ok(true) => info!("periodic polling resumed"),
            Ok(false) => {}
            Err(e) => warn!("could not resume periodic polling: {e}"),
        }
        match self.session.restore() {
            Ok(true) => info!("foreground session resumed"),
            Ok(false) => {}
            Err(e) => warn!("could not resume foreground session: {e}"),
        }
        self.registry.get_active().unwrap_or_default()
    }

    /// Answer one method call.
    pub fn invoke(&self, method: &str, args: &Value) -> Result<Value, ErrorBody> {
        let Some(name) = MethodName::parse(method) else {
            debug!(method, "unknown method");
            return Err(ErrorBody::new(
                ErrorCode::NotImplemented,
                format!("method `{method}` is not implemented"),
            ));
        };
        let invocation = Invocation::parse(name, args, self.default_interval)?;
        self.execute(invocation)
    }

    /// Run a validated invocation.
    pub fn execute(&self, invocation: Invocation) -> Result<Value, ErrorBody> {
        match invocation {
            Invocation::PlatformVersion => Ok(json!(format!(
                "{} {}",
                std::env::consts::OS,
                std::env::consts::ARCH
            ))),
            Invocation::RequestPermission => self
                .dispatcher
                .renderer()
                .request_permission()
                .map(Value::Bool)
                .map_err(|e| to_body(e, ErrorCode::PermissionError)),
            Invocation::CheckPermission => {
                Ok(Value::Bool(self.dispatcher.renderer().permission_granted()))
            }
            Invocation::Show(notification) => self
                .dispatcher
                .show(notification)
                .map(|id| json!(id))
                .map_err(|e| to_body(e, ErrorCode::NotificationError)),
            Invocation::CreateChannel(spec) => self
                .dispatcher
                .create_channel(spec)
                .map(|()| Value::Bool(true))
                .map_err(|e| to_body(e, ErrorCode::ChannelError)),
            Invocation::StartPolling(config) => self
                .poller
                .start(&config)
                .map(|()| Value::Bool(true))
                .map_err(|e| to_body(e, ErrorCode::PollingError)),
            Invocation::StopPolling => self
                .poller
                .stop()
                .map(|()| Value::Bool(true))
                .map_err(|e| to_body(e, ErrorCode::PollingError)),
            Invocation::StartForeground { config, channel_id } => self
                .session
                .start(config, channel_id)
                .map(|()| Value::Bool(true))
                .map_err(|e| to_body(e, ErrorCode::ServiceError)),
            Invocation::StopForeground => self
                .session
                .stop()
                .map(|()| Value::Bool(true))
                .map_err(|e| to_body(e, ErrorCode::ServiceError)),
            Invocation::UseExternalPush => self
                .registry
                .set_active(ActiveService::ExternalPush)
                .map(|_| Value::Bool(true))
                .map_err(|e| to_body(e, ErrorCode::ServiceError)),
            Invocation::GetActiveService => self
                .registry
                .get_active()
                .map(|service| json!(service.as_str()))
                .map_err(|e| to_body(e, ErrorCode::ServiceError)),
        }
    }
}

impl MethodHandler for NotificationPlugin {
    fn handle(&self, method: &str, args: &Value) -> Result<Value, ErrorBody> {
        self.invoke(method, args)
    }

    fn active_service(&self) -> Option<ActiveService> {
        self.registry.get_active().ok()
    }
}
