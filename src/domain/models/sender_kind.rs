/// Provider families this build can construct senders for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SenderKind {
    WechatBot,
    WechatApp,
    FeishuBot,
    DingtalkBot,
    AliyunSms,
}

/// Channels whose `content` is literal text even outside simple mode.
pub const EMAIL_SENDER_TYPE: &str = "email";

impl SenderKind {
    pub const ALL: [SenderKind; 5] = [
        SenderKind::WechatBot,
        SenderKind::WechatApp,
        SenderKind::FeishuBot,
        SenderKind::DingtalkBot,
        SenderKind::AliyunSms,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SenderKind::WechatBot => "wechatBot",
            SenderKind::WechatApp => "wechatApp",
            SenderKind::FeishuBot => "feishuBot",
            SenderKind::DingtalkBot => "dingdingBot",
            SenderKind::AliyunSms => "aliSms",
        }
    }

    pub fn from_type(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }
}
