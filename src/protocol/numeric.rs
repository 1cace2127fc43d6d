//! IRC numeric replies used by the session

pub const RPL_WELCOME: &str = "001";
pub const RPL_ENDOFWHOIS: &str = "318";
pub const RPL_WHOISCHANNELS: &str = "319";

pub const ERR_NOSUCHNICK: &str = "401";
pub const ERR_NOSUCHCHANNEL: &str = "403";
pub const ERR_TOOMANYCHANNELS: &str = "405";
pub const ERR_ERRONEUSNICKNAME: &str = "432";
pub const ERR_NICKNAMEINUSE: &str = "433";
pub const ERR_CHANNELISFULL: &str = "471";
pub const ERR_INVITEONLYCHAN: &str = "473";
pub const ERR_BANNEDFROMCHAN: &str = "474";
pub const ERR_BADCHANNELKEY: &str = "475";
pub const ERR_NEEDREGGEDNICK: &str = "477";

/// Numerics that report a failed JOIN; the channel is the second parameter
pub fn is_join_failure(code: &str) -> bool {
    matches!(
        code,
        ERR_NOSUCHCHANNEL
            | ERR_TOOMANYCHANNELS
            | ERR_CHANNELISFULL
            | ERR_INVITEONLYCHAN
            | ERR_BANNEDFROMCHAN
            | ERR_BADCHANNELKEY
            | ERR_NEEDREGGEDNICK
    )
}

/// Numerics that reject our nickname during registration
pub fn is_nick_rejected(code: &str) -> bool {
    matches!(code, ERR_ERRONEUSNICKNAME | ERR_NICKNAMEINUSE)
}
