#![allow(dead_code)]

//! In-process IRC server and XDCC bot for end-to-end tests

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use xdcc_downloader::{Config, Pack, Server};

/// 127.0.0.1 in DCC integer form
pub const LOCALHOST_DCC: u32 = 2130706433;

/// How the mock answers `WHOIS <bot>`
#[derive(Debug, Clone)]
pub enum Whois {
    Channels(Vec<String>),
    NoChannels,
    NoSuchNick,
    /// Never answer, not even with ENDOFWHOIS
    Silent,
    /// Answer with `ERROR :<text>` as a server does before closing a banned link
    Error(String),
}

/// How the bot answers `XDCC SEND n`
#[derive(Debug, Clone)]
pub enum OnRequest {
    Offer,
    Notice(String),
    /// Another nick offers `evil.bin` first, then the bot makes its real offer
    OfferFromStranger(String),
    /// Raw CTCP payload from the bot instead of an offer
    Ctcp(String),
}

#[derive(Debug, Clone)]
pub struct BotScript {
    pub bot: String,
    pub whois: Whois,
    pub on_request: OnRequest,
    pub filename: String,
    pub data: Vec<u8>,
    pub chunk_size: usize,
    pub accept_resume: bool,
    /// Hang up the first DCC connection after this many bytes
    pub cut_first_transfer_after: Option<usize>,
    /// Channels whose JOIN is refused with 474
    pub banned_channels: Vec<String>,
}

impl BotScript {
    pub fn new(bot: &str, data: Vec<u8>) -> Self {
        Self {
            bot: bot.to_string(),
            whois: Whois::Channels(vec!["@#xdcc".to_string()]),
            on_request: OnRequest::Offer,
            filename: "a.bin".to_string(),
            data,
            chunk_size: 50,
            accept_resume: true,
            cut_first_transfer_after: None,
            banned_channels: Vec::new(),
        }
    }
}

/// Everything the mock saw
#[derive(Debug, Default)]
pub struct MockLog {
    pub lines: Vec<String>,
    pub sessions: usize,
    pub dcc_connections: usize,
    pub acks: Vec<(u64, Instant)>,
    pub bytes_sent: u64,
    pub stranger_connections: usize,
}

pub struct MockIrcServer {
    pub port: u16,
    log: Arc<Mutex<MockLog>>,
    task: JoinHandle<()>,
}

impl MockIrcServer {
    pub async fn start(script: BotScript) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let log = Arc::new(Mutex::new(MockLog::default()));
        let script = Arc::new(script);

        let task_log = log.clone();
        let task = tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                task_log.lock().unwrap().sessions += 1;
                tokio::spawn(handle_connection(socket, script.clone(), task_log.clone()));
            }
        });

        Self { port, log, task }
    }

    pub fn server(&self) -> Server {
        Server::with_port("127.0.0.1", self.port)
    }

    pub fn log(&self) -> MutexGuard<'_, MockLog> {
        self.log.lock().unwrap()
    }

    /// Wait up to two seconds for the mock's view to satisfy `check`
    pub async fn wait_for(&self, what: &str, check: impl Fn(&MockLog) -> bool) {
        for _ in 0..200 {
            if check(&self.log()) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("mock never saw {}", what);
    }

    /// Wait until the bot has read an ack of `value` bytes
    pub async fn wait_for_ack(&self, value: u64) {
        self.wait_for("the final ack", |log| log.acks.iter().any(|(a, _)| *a == value))
            .await;
    }

    pub fn lines_containing(&self, needle: &str) -> Vec<String> {
        self.log().lines.iter().filter(|l| l.contains(needle)).cloned().collect()
    }
}

impl Drop for MockIrcServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Deterministic file content
pub fn sample_data(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Config with test-friendly timeouts
pub fn test_config(out_dir: &Path) -> Config {
    Config {
        output_dir: out_dir.to_path_buf(),
        timeout: Duration::from_secs(10),
        connect_timeout: Duration::from_secs(2),
        queued_cooldown: Duration::from_secs(1),
        ..Config::default()
    }
}

pub fn pack_for(server: &MockIrcServer, bot: &str, number: u64, out_dir: &Path) -> Pack {
    Pack::new(bot, number, server.server(), out_dir).unwrap()
}

async fn send(writer: &mut OwnedWriteHalf, line: &str) {
    let _ = writer.write_all(format!("{}\r\n", line).as_bytes()).await;
}

async fn handle_connection(socket: TcpStream, script: Arc<BotScript>, log: Arc<Mutex<MockLog>>) {
    let (reader, mut writer) = socket.into_split();
    let mut lines = BufReader::new(reader).lines();
    let mut nick = "*".to_string();
    let bot = script.bot.clone();
    let resume_offset = Arc::new(AtomicU64::new(0));
    let mut dcc_port = 0u16;

    while let Ok(Some(line)) = lines.next_line().await {
        log.lock().unwrap().lines.push(line.clone());
        let (command, rest) = line.split_once(' ').unwrap_or((line.as_str(), ""));

        match command {
            "NICK" => nick = rest.trim().to_string(),
            "USER" => send(&mut writer, &format!(":mock 001 {} :Welcome to the mock network", nick)).await,
            "PING" => send(&mut writer, &format!(":mock PONG mock :{}", rest.trim_start_matches(':'))).await,
            "WHOIS" => match &script.whois {
                Whois::Channels(channels) => {
                    send(&mut writer, &format!(":mock 311 {} {} bot host * :Bot", nick, bot)).await;
                    send(&mut writer, &format!(":mock 319 {} {} :{}", nick, bot, channels.join(" "))).await;
                    send(&mut writer, &format!(":mock 318 {} {} :End of /WHOIS list.", nick, bot)).await;
                }
                Whois::NoChannels => {
                    send(&mut writer, &format!(":mock 311 {} {} bot host * :Bot", nick, bot)).await;
                    send(&mut writer, &format!(":mock 318 {} {} :End of /WHOIS list.", nick, bot)).await;
                }
                Whois::NoSuchNick => {
                    send(&mut writer, &format!(":mock 401 {} {} :No such nick/channel", nick, bot)).await;
                    send(&mut writer, &format!(":mock 318 {} {} :End of /WHOIS list.", nick, bot)).await;
                }
                Whois::Silent => {}
                Whois::Error(text) => send(&mut writer, &format!("ERROR :{}", text)).await,
            },
            "JOIN" => {
                let channel = rest.trim().trim_start_matches(':');
                if script.banned_channels.iter().any(|c| c == channel) {
                    send(&mut writer, &format!(":mock 474 {} {} :Cannot join channel (+b)", nick, channel)).await;
                } else {
                    send(&mut writer, &format!(":{}!user@127.0.0.1 JOIN {}", nick, channel)).await;
                }
            }
            "PRIVMSG" => {
                let text = rest.split_once(" :").map(|(_, t)| t).unwrap_or("");
                if let Some(payload) = text.strip_prefix('\x01') {
                    let payload = payload.trim_end_matches('\x01');
                    if payload.starts_with("DCC RESUME") && script.accept_resume {
                        let position: u64 = payload.rsplit(' ').next().unwrap().parse().unwrap();
                        resume_offset.store(position, Ordering::SeqCst);
                        let accept = format!(
                            ":{}!bot@127.0.0.1 PRIVMSG {} :\x01DCC ACCEPT \"{}\" {} {}\x01",
                            bot, nick, script.filename, dcc_port, position
                        );
                        send(&mut writer, &accept).await;
                    }
                } else if text.to_ascii_uppercase().starts_with("XDCC SEND") {
                    match &script.on_request {
                        OnRequest::Offer => {
                            dcc_port = offer_pack(&mut writer, &script, &log, &resume_offset, &nick).await;
                        }
                        OnRequest::OfferFromStranger(stranger) => {
                            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
                            let port = listener.local_addr().unwrap().port();
                            let stranger_log = log.clone();
                            tokio::spawn(async move {
                                while listener.accept().await.is_ok() {
                                    stranger_log.lock().unwrap().stranger_connections += 1;
                                }
                            });
                            let offer = format!(
                                ":{}!evil@127.0.0.1 PRIVMSG {} :\x01DCC SEND \"evil.bin\" {} {} {}\x01",
                                stranger,
                                nick,
                                LOCALHOST_DCC,
                                port,
                                script.data.len()
                            );
                            send(&mut writer, &offer).await;
                            dcc_port = offer_pack(&mut writer, &script, &log, &resume_offset, &nick).await;
                        }
                        OnRequest::Notice(notice) => {
                            send(&mut writer, &format!(":{}!bot@127.0.0.1 NOTICE {} :{}", bot, nick, notice)).await;
                        }
                        OnRequest::Ctcp(payload) => {
                            send(&mut writer, &format!(":{}!bot@127.0.0.1 PRIVMSG {} :\x01{}\x01", bot, nick, payload)).await;
                        }
                    }
                }
            }
            "QUIT" => break,
            _ => {}
        }
    }
}

/// Open a DCC listener for the scripted file and announce it; returns the port
async fn offer_pack(
    writer: &mut OwnedWriteHalf,
    script: &Arc<BotScript>,
    log: &Arc<Mutex<MockLog>>,
    resume_offset: &Arc<AtomicU64>,
    nick: &str,
) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    resume_offset.store(0, Ordering::SeqCst);
    tokio::spawn(serve_dcc(listener, script.clone(), log.clone(), resume_offset.clone()));
    let offer = format!(
        ":{}!bot@127.0.0.1 PRIVMSG {} :\x01DCC SEND \"{}\" {} {} {}\x01",
        script.bot,
        nick,
        script.filename,
        LOCALHOST_DCC,
        port,
        script.data.len()
    );
    send(writer, &offer).await;
    port
}

async fn serve_dcc(listener: TcpListener, script: Arc<BotScript>, log: Arc<Mutex<MockLog>>, offset: Arc<AtomicU64>) {
    let Ok((mut socket, _)) = listener.accept().await else {
        return;
    };
    let first = {
        let mut log = log.lock().unwrap();
        log.dcc_connections += 1;
        log.dcc_connections == 1
    };

    let start = offset.load(Ordering::SeqCst) as usize;
    let mut end = script.data.len();
    if first {
        if let Some(cut) = script.cut_first_transfer_after {
            end = end.min(start + cut);
        }
    }

    let mut pos = start;
    while pos < end {
        let next = (pos + script.chunk_size).min(end);
        if socket.write_all(&script.data[pos..next]).await.is_err() {
            return;
        }
        log.lock().unwrap().bytes_sent += (next - pos) as u64;
        pos = next;

        let mut ack = [0u8; 8];
        if socket.read_exact(&mut ack).await.is_err() {
            return;
        }
        log.lock().unwrap().acks.push((u64::from_be_bytes(ack), Instant::now()));
    }
}
