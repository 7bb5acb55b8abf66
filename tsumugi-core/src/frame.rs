//! フレーム識別子
//!
//! フレームIDは (スレッドID, フレーム番号, スナップショットタグ) を1つの非負整数に詰めたものです。
//! 上位から順にスレッド16ビット、タグ24ビット、フレーム番号16ビットを使います。

use crate::ThreadId;

const INDEX_BITS: u32 = 16;
const TAG_BITS: u32 = 24;
const THREAD_BITS: u32 = 16;

const INDEX_MASK: i64 = (1 << INDEX_BITS) - 1;

/// スナップショットタグのマスク
pub const TAG_MASK: u32 = (1 << TAG_BITS) - 1;

/// フレームIDに入る最大のスレッドID
pub const MAX_THREAD_ID: u32 = (1 << THREAD_BITS) - 1;

/// フレームIDのデコードエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameIdError {
    #[error("frame id must not be negative: {0}")]
    Negative(i64),
    #[error("frame id out of range: {0}")]
    OutOfRange(i64),
    #[error("frame id names no thread: {0}")]
    NoThread(i64),
}

/// スタックフレームの識別子
///
/// 発行したコンテキストでのみ意味を持ち、フレーム番号は1つの停止スナップショットの間だけ有効です。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId {
    pub thread: ThreadId,
    pub index: u16,
    pub tag: u32,
}

impl FrameId {
    /// フレームIDを作成する（タグは24ビットに切り詰める）
    pub fn new(thread: ThreadId, index: u16, tag: u32) -> Self {
        Self {
            thread,
            index,
            tag: tag & TAG_MASK,
        }
    }

    /// 整数表現にエンコードする
    ///
    /// スレッドIDはレジストリが `MAX_THREAD_ID` 以下に抑えています。
    pub fn encode(&self) -> i64 {
        debug_assert!(self.thread.0 <= MAX_THREAD_ID);
        ((self.thread.0 as i64) << (TAG_BITS + INDEX_BITS))
            | ((self.tag as i64) << INDEX_BITS)
            | self.index as i64
    }

    /// 整数表現からデコードする
    pub fn decode(raw: i64) -> Result<Self, FrameIdError> {
        if raw < 0 {
            return Err(FrameIdError::Negative(raw));
        }
        if raw >> (THREAD_BITS + TAG_BITS + INDEX_BITS) != 0 {
            return Err(FrameIdError::OutOfRange(raw));
        }

        let thread = (raw >> (TAG_BITS + INDEX_BITS)) as u32;
        if thread == 0 {
            return Err(FrameIdError::NoThread(raw));
        }
        let tag = ((raw >> INDEX_BITS) as u32) & TAG_MASK;
        let index = (raw & INDEX_MASK) as u16;

        Ok(Self {
            thread: ThreadId(thread),
            index,
            tag,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        let frame = FrameId::new(ThreadId(3), 7, 42);
        let raw = frame.encode();
        assert!(raw > 0);
        assert_eq!(FrameId::decode(raw), Ok(frame));

        let last = FrameId::new(ThreadId(MAX_THREAD_ID), u16::MAX, TAG_MASK);
        assert_eq!(FrameId::decode(last.encode()), Ok(last));
    }

    #[test]
    fn test_tag_is_masked() {
        let frame = FrameId::new(ThreadId(1), 0, TAG_MASK + 2);
        assert_eq!(frame.tag, 1);
    }

    #[test]
    fn test_decode_invalid() {
        assert_eq!(FrameId::decode(-1), Err(FrameIdError::Negative(-1)));
        assert_eq!(FrameId::decode(5), Err(FrameIdError::NoThread(5)));
        assert_eq!(FrameId::decode(i64::MAX), Err(FrameIdError::OutOfRange(i64::MAX)));
    }
}
