//! IRC session
//!
//! One connection attempt for one pack: register, WHOIS the bot, join its
//! channels, send `XDCC SEND n`, negotiate resume and run the DCC transfer.
//! The session loop multiplexes IRC reads, timeout watcher events, the
//! transfer task and the resume/request timers with `tokio::select!`.

use std::future::pending;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{sleep_until, timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::cli::Config;
use crate::dcc::{DccOffer, DccTransfer, Throttle, TransferSnapshot, TransferState};
use crate::error::XdccError;
use crate::irc::state::{
    is_already_requested, parse_queue_position, strip_channel_prefix, SessionFlags, SessionOutcome, SessionState,
};
use crate::irc::user::User;
use crate::pack::Pack;
use crate::protocol::ctcp::{extract_ctcp, wrap_ctcp};
use crate::protocol::numeric::{self, is_join_failure, is_nick_rejected};
use crate::protocol::{CtcpMessage, DccCommand, IrcMessage, IrcWire, LineWire};
use crate::storage::FileStorage;
use crate::supervisor::watcher::{TimeoutWatcher, WatchEvent};

const REALNAME: &str = "xdcc-dl";

type TransferHandle = JoinHandle<Result<TransferState, XdccError>>;

/// A `DCC RESUME` waiting for the bot's `DCC ACCEPT`
#[derive(Debug)]
struct PendingResume {
    offer: DccOffer,
    position: u64,
    deadline: Instant,
}

/// A single IRC connection attempt for a pack
pub struct IrcSession<'a> {
    pack: &'a mut Pack,
    config: Arc<Config>,
    user: User,
    wire: LineWire,
    address: String,
    state: SessionState,
    flags: Arc<SessionFlags>,
    cancel: CancellationToken,
    progress_tx: Option<watch::Sender<TransferSnapshot>>,
    welcomed: bool,
    channels: Option<Vec<String>>,
    pending_joins: Vec<String>,
    joined: usize,
    request_at: Option<Instant>,
    resume: Option<PendingResume>,
    transfer: Option<TransferHandle>,
    irc_open: bool,
}

impl<'a> IrcSession<'a> {
    pub fn new(pack: &'a mut Pack, config: Arc<Config>) -> Self {
        let address = pack.server().connect_addr();
        let user = User::from_config(config.username.as_deref());
        Self {
            pack,
            config,
            user,
            wire: LineWire::new(),
            address,
            state: SessionState::Connecting,
            flags: Arc::new(SessionFlags::new()),
            cancel: CancellationToken::new(),
            progress_tx: None,
            welcomed: false,
            channels: None,
            pending_joins: Vec::new(),
            joined: 0,
            request_at: None,
            resume: None,
            transfer: None,
            irc_open: true,
        }
    }

    /// Stop the session (and its transfer) when `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Publish transfer progress on `progress_tx`
    pub fn with_progress(mut self, progress_tx: watch::Sender<TransferSnapshot>) -> Self {
        self.progress_tx = Some(progress_tx);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn flags(&self) -> Arc<SessionFlags> {
        self.flags.clone()
    }

    /// Run the session to its end
    ///
    /// The watcher, the transfer and the IRC connection are all shut down
    /// before this returns, so a partial file is flushed when the retry
    /// loop looks at it.
    pub async fn run(mut self) -> Result<SessionOutcome, XdccError> {
        let (event_tx, mut events) = mpsc::channel(4);
        let watcher = TimeoutWatcher::new(
            self.config.timeout,
            self.config.ping_grace,
            self.flags.clone(),
            self.cancel.child_token(),
        );
        let watcher_handle = tokio::spawn(watcher.run(event_tx));

        let stream = match self.connect().await {
            Ok(stream) => stream,
            Err(e) => {
                self.flags.mark_disconnected();
                self.cancel.cancel();
                let _ = watcher_handle.await;
                return Err(e);
            }
        };
        let (mut reader, mut writer) = stream.into_split();

        let result = self.drive(&mut reader, &mut writer, &mut events).await;
        match &result {
            Ok(outcome) => debug!("Session outcome: {:?}", outcome),
            Err(e) => debug!("Session ended with error: {}", e),
        }

        self.shutdown(&mut writer).await;
        let _ = watcher_handle.await;
        result
    }

    async fn connect(&self) -> Result<TcpStream, XdccError> {
        info!("Connecting to IRC server {}", self.address);

        let stream = timeout(self.config.connect_timeout, TcpStream::connect(self.address.as_str()))
            .await
            .map_err(|e| {
                warn!("Connection timeout to {}", self.address);
                XdccError::network_error_full("IRC connection timeout", self.address.clone(), e.to_string())
            })?
            .map_err(|e| {
                error!("Failed to connect to {}: {}", self.address, e);
                XdccError::network_error_full("Failed to connect to IRC server", self.address.clone(), e.to_string())
            })?;

        info!("Connected to {}", self.address);
        Ok(stream)
    }

    async fn drive(
        &mut self,
        reader: &mut OwnedReadHalf,
        writer: &mut OwnedWriteHalf,
        events: &mut mpsc::Receiver<WatchEvent>,
    ) -> Result<SessionOutcome, XdccError> {
        let user = self.user.clone();
        self.send(writer, IrcMessage::nick(user.nick())).await?;
        self.send(writer, IrcMessage::user(user.username(), REALNAME)).await?;

        let mut watcher_alive = true;
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Session cancelled");
                    self.set_state(SessionState::Aborted);
                    return Err(XdccError::unrecoverable("interrupted"));
                }
                read = self.wire.read_message(reader), if self.irc_open => match read {
                    Ok(Some(message)) => {
                        if let Some(outcome) = self.handle_message(message, writer).await? {
                            return Ok(outcome);
                        }
                    }
                    Ok(None) => self.irc_closed("connection closed by server")?,
                    Err(e) => self.irc_closed(&e.to_string())?,
                },
                event = events.recv(), if watcher_alive => match event {
                    Some(WatchEvent::Ping) => {
                        let token = self.pack.server().address.clone();
                        self.send(writer, IrcMessage::ping(&token)).await?;
                    }
                    Some(WatchEvent::Expired { elapsed }) => {
                        self.set_state(SessionState::Aborted);
                        return Err(XdccError::timeout_after(
                            format!("No XDCC request sent to {}", self.pack.bot_nick()),
                            elapsed.as_secs(),
                        ));
                    }
                    None => watcher_alive = false,
                },
                joined = join_transfer(&mut self.transfer) => return self.finish_transfer(joined),
                _ = sleep_until_opt(self.resume.as_ref().map(|r| r.deadline)) => return self.resume_expired(),
                _ = sleep_until_opt(self.request_at) => {
                    self.request_at = None;
                    self.send_request(writer).await?;
                }
            }
        }
    }

    async fn handle_message(
        &mut self,
        message: IrcMessage,
        writer: &mut OwnedWriteHalf,
    ) -> Result<Option<SessionOutcome>, XdccError> {
        trace!("<- {}", message);

        match message.command.as_str() {
            "PING" => {
                let token = message.trailing().unwrap_or_default().to_string();
                self.send(writer, IrcMessage::pong(&token)).await?;
            }
            numeric::RPL_WELCOME => self.on_welcome(writer).await?,
            numeric::RPL_WHOISCHANNELS => self.on_whois_channels(&message),
            numeric::RPL_ENDOFWHOIS => self.on_end_of_whois(writer).await?,
            numeric::ERR_NOSUCHNICK => {
                let bot = self.pack.bot_nick().to_string();
                if message.param(1).is_some_and(|nick| nick.eq_ignore_ascii_case(&bot)) {
                    error!("Bot {} does not exist on {}", bot, self.address);
                    self.set_state(SessionState::Aborted);
                    return Err(XdccError::bot_not_found(bot));
                }
            }
            code if is_nick_rejected(code) => self.on_nick_rejected(writer).await?,
            code if is_join_failure(code) => self.on_join_failed(&message, writer).await?,
            "JOIN" => self.on_join(&message, writer).await?,
            "PRIVMSG" => return self.on_privmsg(&message, writer).await,
            "NOTICE" => return Ok(self.on_notice(&message)),
            "ERROR" => self.on_error(&message)?,
            _ => {}
        }

        Ok(None)
    }

    async fn on_welcome(&mut self, writer: &mut OwnedWriteHalf) -> Result<(), XdccError> {
        self.welcomed = true;
        info!("Registered as {}", self.user.nick());
        self.set_state(SessionState::WhoisPending);
        let bot = self.pack.bot_nick().to_string();
        self.send(writer, IrcMessage::whois(&bot)).await
    }

    async fn on_nick_rejected(&mut self, writer: &mut OwnedWriteHalf) -> Result<(), XdccError> {
        if self.welcomed {
            return Ok(());
        }
        warn!("Nick {} rejected by server", self.user.nick());
        let nick = self.user.collide().to_string();
        self.send(writer, IrcMessage::nick(&nick)).await
    }

    fn on_whois_channels(&mut self, message: &IrcMessage) {
        let is_bot = message
            .param(1)
            .is_some_and(|nick| nick.eq_ignore_ascii_case(self.pack.bot_nick()));
        if !is_bot || message.params.len() < 3 {
            return;
        }

        let channels = self.channels.get_or_insert_with(Vec::new);
        for entry in message.trailing().unwrap_or_default().split_whitespace() {
            let channel = strip_channel_prefix(entry);
            if channel.starts_with(['#', '&']) && !channels.iter().any(|c| c.eq_ignore_ascii_case(channel)) {
                channels.push(channel.to_string());
            }
        }
        debug!("Bot channels so far: {:?}", channels);
    }

    async fn on_end_of_whois(&mut self, writer: &mut OwnedWriteHalf) -> Result<(), XdccError> {
        if self.state != SessionState::WhoisPending {
            return Ok(());
        }
        self.set_state(SessionState::Joining);

        let channels = self.channels.clone().unwrap_or_default();
        if !channels.is_empty() {
            info!("Bot {} is in {}", self.pack.bot_nick(), channels.join(", "));
            return self.join_channels(channels, writer).await;
        }

        if !self.config.fallback_channels.is_empty() {
            let fallback = self.config.fallback_channels.clone();
            info!("Bot {} is in no visible channel, joining {}", self.pack.bot_nick(), fallback.join(", "));
            return self.join_channels(fallback, writer).await;
        }

        info!("Bot {} is in no visible channel, sending request anyway", self.pack.bot_nick());
        self.schedule_request(writer).await
    }

    async fn join_channels(&mut self, channels: Vec<String>, writer: &mut OwnedWriteHalf) -> Result<(), XdccError> {
        for channel in channels {
            self.send(writer, IrcMessage::join(&channel)).await?;
            self.pending_joins.push(channel);
        }
        Ok(())
    }

    async fn on_join(&mut self, message: &IrcMessage, writer: &mut OwnedWriteHalf) -> Result<(), XdccError> {
        if !message.source_nick().is_some_and(|nick| self.user.is(nick)) {
            return Ok(());
        }
        let channel = message.param(0).unwrap_or_default();
        self.pending_joins.retain(|c| !c.eq_ignore_ascii_case(channel));
        self.joined += 1;
        info!("Joined {}", channel);
        self.schedule_request(writer).await
    }

    async fn on_join_failed(&mut self, message: &IrcMessage, writer: &mut OwnedWriteHalf) -> Result<(), XdccError> {
        let channel = message.param(1).unwrap_or_default();
        let Some(index) = self.pending_joins.iter().position(|c| c.eq_ignore_ascii_case(channel)) else {
            return Ok(());
        };
        self.pending_joins.remove(index);
        warn!(
            "Cannot join {} ({}): {}",
            channel,
            message.command,
            message.trailing().unwrap_or_default()
        );

        if self.pending_joins.is_empty() && self.joined == 0 {
            warn!("No channel could be joined, sending request anyway");
            self.schedule_request(writer).await?;
        }
        Ok(())
    }

    /// Send the request now, or after the configured wait time
    async fn schedule_request(&mut self, writer: &mut OwnedWriteHalf) -> Result<(), XdccError> {
        if self.flags.message_sent() || self.request_at.is_some() {
            return Ok(());
        }
        if self.config.wait_time.is_zero() {
            return self.send_request(writer).await;
        }
        info!("Waiting {}s before requesting the pack", self.config.wait_time.as_secs());
        self.request_at = Some(Instant::now() + self.config.wait_time);
        Ok(())
    }

    async fn send_request(&mut self, writer: &mut OwnedWriteHalf) -> Result<(), XdccError> {
        let bot = self.pack.bot_nick().to_string();
        let request = self.pack.request_message();
        info!("Requesting pack #{} from {}", self.pack.pack_number(), bot);
        self.send(writer, IrcMessage::privmsg(&bot, &request)).await?;
        self.flags.mark_message_sent();
        self.set_state(SessionState::AwaitingCtcp);
        Ok(())
    }

    async fn on_privmsg(
        &mut self,
        message: &IrcMessage,
        writer: &mut OwnedWriteHalf,
    ) -> Result<Option<SessionOutcome>, XdccError> {
        let Some(payload) = message.trailing().and_then(extract_ctcp) else {
            trace!("Message from {:?}: {:?}", message.source_nick(), message.trailing());
            return Ok(None);
        };
        let sender = message.source_nick().unwrap_or_default().to_string();
        let from_bot = sender.eq_ignore_ascii_case(self.pack.bot_nick());

        let ctcp = match CtcpMessage::parse(payload) {
            Ok(ctcp) => ctcp,
            Err(e) if from_bot => {
                error!("Invalid CTCP from {}: {}", sender, e);
                self.set_state(SessionState::Aborted);
                return Err(e);
            }
            Err(e) => {
                debug!("Ignoring invalid CTCP from {}: {}", sender, e);
                return Ok(None);
            }
        };

        match ctcp {
            CtcpMessage::Version => {
                let reply = wrap_ctcp(&format!("VERSION {} {}", REALNAME, env!("CARGO_PKG_VERSION")));
                self.send(writer, IrcMessage::notice(&sender, &reply)).await?;
            }
            CtcpMessage::Ping(token) => {
                let reply = match token {
                    Some(token) => wrap_ctcp(&format!("PING {}", token)),
                    None => wrap_ctcp("PING"),
                };
                self.send(writer, IrcMessage::notice(&sender, &reply)).await?;
            }
            CtcpMessage::Dcc(_) if !from_bot => {
                warn!("Ignoring DCC offer from {} (waiting for {})", sender, self.pack.bot_nick());
            }
            CtcpMessage::Dcc(command @ DccCommand::Send { .. }) => {
                if let Some(offer) = DccOffer::from_command(&command) {
                    return self.on_dcc_send(offer, writer).await;
                }
            }
            CtcpMessage::Dcc(DccCommand::Accept { filename, port, position }) => {
                self.on_dcc_accept(&filename, port, position)?;
            }
            CtcpMessage::Dcc(DccCommand::Resume { .. }) => {
                error!("Bot sent DCC RESUME to a receiver");
                self.set_state(SessionState::Aborted);
                return Err(XdccError::invalid_ctcp_with_payload("Unexpected DCC RESUME", payload));
            }
            CtcpMessage::Other { command, .. } => {
                debug!("Ignoring CTCP {} from {}", command, sender);
            }
        }
        Ok(None)
    }

    async fn on_dcc_send(
        &mut self,
        offer: DccOffer,
        writer: &mut OwnedWriteHalf,
    ) -> Result<Option<SessionOutcome>, XdccError> {
        if self.transfer.is_some() || self.resume.is_some() {
            warn!("Ignoring DCC SEND for '{}' while another transfer is pending", offer.filename);
            return Ok(None);
        }

        self.pack.assign_filename(&offer.filename)?;
        let path = self.pack.filepath()?;
        let existing = FileStorage::file_len(&path).await.map_err(|e| {
            XdccError::storage_error_full("Failed to inspect existing file", path.display().to_string(), e.to_string())
        })?;

        let existing = match existing {
            Some(len) if len >= offer.filesize => {
                info!(
                    "{} already holds {} of {} bytes, nothing to download",
                    path.display(),
                    len,
                    offer.filesize
                );
                self.set_state(SessionState::Completed);
                return Ok(Some(SessionOutcome::AlreadyDownloaded { path, bytes: len }));
            }
            Some(0) | None => {
                self.start_transfer(offer, 0)?;
                return Ok(None);
            }
            Some(len) => len,
        };

        info!("Resuming '{}' at {} of {} bytes", offer.filename, existing, offer.filesize);
        let resume = DccCommand::Resume {
            filename: offer.filename.clone(),
            port: offer.port,
            position: existing,
        };
        let bot = self.pack.bot_nick().to_string();
        self.send(writer, IrcMessage::privmsg(&bot, &wrap_ctcp(&resume.to_payload()))).await?;

        self.resume = Some(PendingResume {
            offer,
            position: existing,
            deadline: Instant::now() + self.config.dcc_timeout,
        });
        self.set_state(SessionState::ResumeRequested);
        Ok(None)
    }

    fn on_dcc_accept(&mut self, filename: &str, port: u16, position: u64) -> Result<(), XdccError> {
        let Some(pending) = self.resume.take() else {
            warn!("Ignoring unsolicited DCC ACCEPT for '{}'", filename);
            return Ok(());
        };

        if port != pending.offer.port {
            warn!("DCC ACCEPT on port {} does not match the offer on port {}", port, pending.offer.port);
            self.resume = Some(pending);
            return Ok(());
        }

        if position > pending.position {
            error!(
                "Bot wants to resume '{}' at {} but only {} bytes are on disk",
                filename, position, pending.position
            );
            self.set_state(SessionState::Aborted);
            return Err(XdccError::invalid_ctcp(format!(
                "DCC ACCEPT position {} beyond local size {}",
                position, pending.position
            )));
        }
        if position < pending.position {
            warn!("Bot resumes at {} instead of {}, discarding the tail", position, pending.position);
        }

        info!("Bot accepted resume of '{}' at {}", filename, position);
        self.start_transfer(pending.offer, position)
    }

    fn start_transfer(&mut self, offer: DccOffer, offset: u64) -> Result<(), XdccError> {
        let path = self.pack.filepath()?;
        info!(
            "Receiving '{}' ({} bytes) from {} into {}",
            offer.filename,
            offer.filesize,
            offer.socket_addr(),
            path.display()
        );

        let mut transfer = DccTransfer::new(offer, FileStorage::new(path), offset)
            .with_throttle(Throttle::new(self.config.download_limit))
            .with_timeouts(self.config.connect_timeout, self.config.dcc_timeout)
            .with_cancellation(self.cancel.child_token());
        if let Some(tx) = &self.progress_tx {
            transfer = transfer.with_progress(tx.clone());
        }

        self.transfer = Some(tokio::spawn(async move { transfer.run().await }));
        self.set_state(SessionState::Receiving);
        Ok(())
    }

    fn finish_transfer(
        &mut self,
        joined: Result<Result<TransferState, XdccError>, JoinError>,
    ) -> Result<SessionOutcome, XdccError> {
        let state = match joined {
            Ok(Ok(state)) => state,
            Ok(Err(e)) => {
                warn!("DCC transfer failed: {}", e);
                self.set_state(SessionState::Aborted);
                return Err(e.with_context(format!("pack #{} from {}", self.pack.pack_number(), self.pack.bot_nick())));
            }
            Err(e) => {
                error!("DCC transfer task failed: {}", e);
                self.set_state(SessionState::Aborted);
                return Err(XdccError::unrecoverable_with_source("DCC transfer task failed", e.to_string()));
            }
        };

        let path = self.pack.filepath()?;
        if state.completed {
            info!("Download of {} complete ({} bytes)", path.display(), state.progress);
            self.set_state(SessionState::Completed);
            Ok(SessionOutcome::Completed {
                path,
                bytes: state.progress,
            })
        } else {
            warn!(
                "Download of {} incomplete: {} of {} bytes",
                path.display(),
                state.progress,
                state.filesize
            );
            self.set_state(SessionState::Incomplete);
            Ok(SessionOutcome::Incomplete {
                path: Some(path),
                progress: state.progress,
                filesize: state.filesize,
            })
        }
    }

    fn resume_expired(&mut self) -> Result<SessionOutcome, XdccError> {
        let Some(pending) = self.resume.take() else {
            return Err(XdccError::protocol_error("Resume deadline without a pending resume"));
        };
        warn!(
            "Bot did not accept resume of '{}' within {}s",
            pending.offer.filename,
            self.config.dcc_timeout.as_secs()
        );
        self.set_state(SessionState::Incomplete);
        Ok(SessionOutcome::Incomplete {
            path: self.pack.filepath().ok(),
            progress: pending.position,
            filesize: pending.offer.filesize,
        })
    }

    fn on_notice(&mut self, message: &IrcMessage) -> Option<SessionOutcome> {
        let target = message.param(0).unwrap_or_default();
        if !self.user.is(target) || message.params.len() < 2 {
            return None;
        }
        let sender = message.source_nick().unwrap_or("server");
        let text = message.trailing().unwrap_or_default();
        if extract_ctcp(text).is_some() {
            trace!("CTCP reply from {}: {:?}", sender, text);
            return None;
        }

        if is_already_requested(text) {
            if self.transfer.is_some() {
                warn!("{} reports a duplicate request during the transfer: {}", sender, text);
                return None;
            }
            warn!("{}: pack #{} was already requested", sender, self.pack.pack_number());
            self.set_state(SessionState::Aborted);
            return Some(SessionOutcome::PackAlreadyRequested);
        }

        match parse_queue_position(text) {
            Some(position) => info!("Queued by {} at position {}", sender, position),
            None => info!("Notice from {}: {}", sender, text),
        }
        None
    }

    fn on_error(&mut self, message: &IrcMessage) -> Result<(), XdccError> {
        let text = message.trailing().unwrap_or_default();
        if self.transfer.is_some() {
            warn!("IRC server closed the link during the transfer: {}", text);
            self.irc_open = false;
            return Ok(());
        }
        error!("IRC server error: {}", text);
        self.set_state(SessionState::Aborted);
        Err(XdccError::unrecoverable_with_source("possible IP ban", text))
    }

    /// The IRC side went away; only fatal when no transfer is running
    fn irc_closed(&mut self, reason: &str) -> Result<(), XdccError> {
        self.irc_open = false;
        if self.transfer.is_some() {
            info!("IRC connection lost ({}), continuing DCC transfer", reason);
            return Ok(());
        }
        warn!("IRC connection to {} lost: {}", self.address, reason);
        self.set_state(SessionState::Aborted);
        Err(XdccError::network_error_full("IRC connection lost", self.address.clone(), reason))
    }

    async fn send(&mut self, writer: &mut OwnedWriteHalf, message: IrcMessage) -> Result<(), XdccError> {
        if !self.irc_open {
            debug!("IRC connection closed, dropping {}", message.command);
            return Ok(());
        }
        trace!("-> {}", message);
        self.wire.write_message(writer, &message).await.map_err(|e| {
            error!("Failed to send {} to {}: {}", message.command, self.address, e);
            XdccError::network_error_full("Failed to send IRC message", self.address.clone(), e.to_string())
        })
    }

    async fn shutdown(&mut self, writer: &mut OwnedWriteHalf) {
        self.flags.mark_disconnected();
        self.cancel.cancel();

        if let Some(handle) = self.transfer.take() {
            match handle.await {
                Ok(Ok(state)) => debug!("DCC transfer stopped at {} bytes", state.progress),
                Ok(Err(e)) => warn!("DCC transfer stopped: {}", e),
                Err(e) => warn!("DCC transfer task failed: {}", e),
            }
        }

        if self.irc_open {
            let quit = IrcMessage::quit("Bye");
            if timeout(Duration::from_secs(2), self.wire.write_message(writer, &quit)).await.is_err() {
                debug!("QUIT not sent in time");
            }
            self.irc_open = false;
        }
        let _ = writer.shutdown().await;
        debug!("Session for pack #{} closed in state {:?}", self.pack.pack_number(), self.state);
    }

    fn set_state(&mut self, next: SessionState) {
        if self.state != next {
            debug!("Session state {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    /// Path the pack is written to, once the bot announced a filename
    pub fn target_path(&self) -> Option<PathBuf> {
        self.pack.filepath().ok()
    }
}

/// Wait for the transfer task; never resolves when none is running
async fn join_transfer(transfer: &mut Option<TransferHandle>) -> Result<Result<TransferState, XdccError>, JoinError> {
    match transfer {
        Some(handle) => {
            let result = handle.await;
            *transfer = None;
            result
        }
        None => pending().await,
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}
