//! User-facing texts sent to the chat group.

pub const HELP_MESSAGE: &str = "!!help: 显示本条帮助信息
!!ping: pong!!
!!info 获取服务器运行信息
!!online: 显示在线玩家列表
!!stats <类别> <内容> [<-bot>]: 查询统计信息 <类别>.<内容> 的排名";

pub const STATS_HELP_MESSAGE: &str = "!!stats <类别> <内容> [<-bot>]
添加 `-bot` 来列出 bot
例子:
!!stats used diamond_pickaxe
!!stats custom time_since_rest -bot";

pub const PONG: &str = "pong!!";
pub const CLIENT_OFFLINE: &str = "ChatBridge 客户端离线";

pub const STATS_NOT_FOUND: &str = "统计信息未找到";
pub const STATS_PLUGIN_NOT_LOADED: &str = "StatsHelper 插件未加载";
pub const STATS_TOTAL_LABEL: &str = "总数：";
pub const ONLINE_HEADER: &str = "====== 玩家列表 ======";

pub const FETCHING_SERVER_INFO: &str = "正在获取服务器运行信息，请稍后...";
pub const SERVER_INFO_NOT_CONFIGURED: &str = "未配置服务器信息接口";
