//! 消息限流与重复内容防刷。
//!
//! 每用户一条记录：滑动窗口内的发送时间戳、封禁截止时刻、
//! 最近若干条归一化内容。记录在首次发送时惰性创建，
//! 连接关闭时销毁（跨会话不保留记忆）。

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use config::RateLimitConfig;
use domain::UserId;

use crate::clock::Clock;

/// 限流检查结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Denied {
        reason: String,
        retry_after_secs: Option<u64>,
    },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed)
    }
}

/// 单个用户的限流记录
#[derive(Debug, Default)]
struct RateLimitRecord {
    /// 窗口内的发送时刻（Unix 毫秒），只保留最近 window_ms 内的条目
    window: Vec<i64>,
    /// 封禁截止时刻（Unix 毫秒），0 表示未封禁
    blocked_until: i64,
    /// 最近发送的归一化内容，容量受 recent_cap 限制
    recent: VecDeque<String>,
}

/// 消息限流器
///
/// 同一用户的检查不会并发执行（一个用户最多一个活跃连接，
/// 入站处理按连接串行），记录表用单把锁保护即可。
pub struct SpamGuard {
    policy: RateLimitConfig,
    clock: Arc<dyn Clock>,
    records: Mutex<HashMap<UserId, RateLimitRecord>>,
}

impl SpamGuard {
    pub fn new(policy: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            clock,
            records: Mutex::new(HashMap::new()),
        }
    }

    /// 检查一次发送是否放行。
    ///
    /// 判定顺序：封禁检查（不改状态）→ 清理过期窗口条目 →
    /// 重复内容检查（拒绝时不推进状态）→ 窗口超限检查（设置封禁）→
    /// 放行并记账。
    pub fn check(&self, user_id: UserId, content: &str) -> RateDecision {
        let now = self.clock.now_millis();
        let mut records = self.records.lock().expect("rate limit lock poisoned");
        let record = records.entry(user_id).or_default();

        // 封禁期内直接拒绝，剩余秒数向上取整
        if record.blocked_until > now {
            let remaining = ((record.blocked_until - now) + 999) / 1000;
            return RateDecision::Denied {
                reason: format!(
                    "You are temporarily blocked. Wait {} seconds.",
                    remaining
                ),
                retry_after_secs: Some(remaining as u64),
            };
        }

        // 惰性清理滑动窗口
        let window_ms = self.policy.window_ms;
        record.window.retain(|ts| now - ts < window_ms);

        // 连续重复内容检查；拒绝不计入窗口也不追加内容
        let normalized = content.trim().to_lowercase();
        if record.recent.len() >= self.policy.repeat_limit {
            let repeated = record
                .recent
                .iter()
                .rev()
                .take(self.policy.repeat_limit)
                .all(|msg| *msg == normalized);
            if repeated {
                return RateDecision::Denied {
                    reason: format!(
                        "Do not send the same message repeatedly. Maximum {} identical messages in a row.",
                        self.policy.repeat_limit
                    ),
                    retry_after_secs: None,
                };
            }
        }

        // 窗口超限则进入封禁
        if record.window.len() >= self.policy.max_per_window {
            record.blocked_until = now + self.policy.block_ms;
            let block_secs = (self.policy.block_ms / 1000) as u64;
            return RateDecision::Denied {
                reason: format!(
                    "Limit of {} messages in {} seconds reached. Blocked for {} seconds.",
                    self.policy.max_per_window,
                    self.policy.window_ms / 1000,
                    block_secs
                ),
                retry_after_secs: Some(block_secs),
            };
        }

        record.window.push(now);
        record.recent.push_back(normalized);
        while record.recent.len() > self.policy.recent_cap {
            record.recent.pop_front();
        }

        RateDecision::Allowed
    }

    /// 连接关闭时丢弃该用户的记录，重连后窗口从零开始。
    pub fn forget(&self, user_id: UserId) {
        self.records
            .lock()
            .expect("rate limit lock poisoned")
            .remove(&user_id);
    }

    /// 当前是否持有该用户的记录
    pub fn has_record(&self, user_id: UserId) -> bool {
        self.records
            .lock()
            .expect("rate limit lock poisoned")
            .contains_key(&user_id)
    }
}
