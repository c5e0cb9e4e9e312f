//! Numeric replies the daemon reacts to.
//!
//! Numerics are kept as their three-digit command tokens since the
//! dispatcher matches handlers on the raw token.

/// Registration complete.
pub const RPL_WELCOME: &str = "001";
/// Server feature advertisement.
pub const RPL_ISUPPORT: &str = "005";
/// WHOIS: nick, user, host, realname.
pub const RPL_WHOISUSER: &str = "311";
/// End of a WHOIS reply.
pub const RPL_ENDOFWHOIS: &str = "318";
/// OPER succeeded.
pub const RPL_YOUREOPER: &str = "381";
/// No such nick/channel.
pub const ERR_NOSUCHNICK: &str = "401";
/// Nickname already in use.
pub const ERR_NICKNAMEINUSE: &str = "433";
/// SASL: logged in as account.
pub const RPL_LOGGEDIN: &str = "900";
/// SASL authentication succeeded.
pub const RPL_SASLSUCCESS: &str = "903";
/// SASL authentication failed.
pub const ERR_SASLFAIL: &str = "904";
/// SASL payload too long.
pub const ERR_SASLTOOLONG: &str = "905";
/// SASL aborted.
pub const ERR_SASLABORTED: &str = "906";
/// Already authenticated.
pub const ERR_SASLALREADY: &str = "907";
/// Server's SASL mechanism list.
pub const RPL_SASLMECHS: &str = "908";

/// Numerics that conclude a SASL exchange one way or the other.
pub const SASL_DONE: [&str; 6] = [
    RPL_SASLSUCCESS,
    ERR_SASLFAIL,
    ERR_SASLTOOLONG,
    ERR_SASLABORTED,
    ERR_SASLALREADY,
    RPL_SASLMECHS,
];
