use axum::Json;
use rand::{seq::SliceRandom, Rng};
use serde::Serialize;

use super::{CodeMessage, MethodData};
use crate::{
  metrics::http_server,
  privileges::{Privileges, UserPrivileges},
};

const KAOMOJIS: &[&str] = &[
  "Σ(ノ°▽°)ノ",
  "( ƅ°ਉ°)ƅ",
  "ヽ(　･∀･)ﾉ",
  "˭̡̞(◞⁎˃ᆺ˂)◞*✰",
  "(p^-^)p",
  "(ﾉ^∇^)ﾉﾟ",
  "ヽ(〃･ω･)ﾉ",
  "(۶* ‘ꆚ’)۶”",
  "（。＞ω＜）。",
  "（ﾉ｡≧◇≦）ﾉ",
  "ヾ(｡･ω･)ｼ",
  "(ﾉ･д･)ﾉ",
  ".+:｡(ﾉ･ω･)ﾉﾞ",
  "Σ(*ﾉ´>ω<｡`)ﾉ",
  "ヾ（〃＾∇＾）ﾉ♪",
  "＼（＠￣∇￣＠）／",
  "＼(^▽^＠)ノ",
  "ヾ(@^▽^@)ノ",
  "(((＼（＠v＠）／)))",
  "＼(*T▽T*)／",
  "＼（＾▽＾）／",
  "＼（Ｔ∇Ｔ）／",
  "ヽ( ★ω★)ノ",
  "ヽ(；▽；)ノ",
  "ヾ(。◕ฺ∀◕ฺ)ノ",
  "ヾ(＠† ▽ †＠）ノ",
  "ヾ(＠^∇^＠)ノ",
  "ヾ(＠^▽^＠)ﾉ",
  "ヾ（＠＾▽＾＠）ノ",
  "ヾ(＠゜▽゜＠）ノ",
  "(.=^・ェ・^=)",
  "((≡^⚲͜^≡))",
  "(^･o･^)ﾉ”",
  "(^._.^)ﾉ",
  "(^人^)",
  "(=；ェ；=)",
  "(=｀ω´=)",
  "(=｀ェ´=)",
  "（=´∇｀=）",
  "(=^･^=)",
  "(=^･ｪ･^=)",
  "(=^‥^=)",
  "(=ＴェＴ=)",
  "(=ｘェｘ=)",
  "＼(=^‥^)/’`",
  "~(=^‥^)/",
  "└(=^‥^=)┐",
  "ヾ(=ﾟ･ﾟ=)ﾉ",
  "ヽ(=^･ω･^=)丿",
  "d(=^･ω･^=)b",
  "o(^・x・^)o",
  "V(=^･ω･^=)v",
  "(⁎˃ᆺ˂)",
  "(,,^・⋏・^,,)",
];

const SENTENCES: &[&str] = &[
  "cheese",
  "mayonaise",
  "pickles",
  "pumpernickel",
  "tomaten chutney",
  "hot italian giardiniera",
  "egg escabeche",
  "goat cheese",
  "philly cheese steak",
  "corned beef",
  "tarragon yoghurt dressing",
  "turkey arugula",
];

fn kaomoji<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
  KAOMOJIS.choose(rng).copied().unwrap_or_default()
}

fn surprise<R: Rng + ?Sized>(rng: &mut R) -> String {
  let sentence = SENTENCES.choose(rng).copied().unwrap_or_default();
  format!("{sentence} {}", kaomoji(rng))
}

#[derive(Serialize)]
pub(super) struct PingResponse {
  #[serde(flatten)]
  base: CodeMessage,
  user_id: i32,
  privileges: Privileges,
  user_privileges: UserPrivileges,
  privileges_string: String,
  user_privileges_string: String,
}

/// Tells the caller who we think they are and what their token lets them do.
pub(super) async fn ping(md: MethodData) -> Json<PingResponse> {
  http_server::requests_total("ping").inc();

  let message = if md.user.is_anonymous() {
    format!(
      "You have not given us a token, so we don't know who you are! But you can still login with \
       POST /tokens {}",
      kaomoji(&mut rand::thread_rng())
    )
  } else {
    surprise(&mut rand::thread_rng())
  };

  http_server::requests_success_total("ping").inc();
  Json(PingResponse {
    base: CodeMessage {
      code: 200,
      message: Some(message),
    },
    user_id: md.user_id(),
    privileges: md.user.token_privileges,
    user_privileges: md.user.user_privileges,
    privileges_string: md.user.token_privileges.to_string(),
    user_privileges_string: md.user.user_privileges.to_string(),
  })
}

#[derive(Serialize)]
pub(super) struct SurpriseMeResponse {
  #[serde(flatten)]
  base: CodeMessage,
  cats: Vec<String>,
}

pub(super) async fn surprise_me() -> Json<SurpriseMeResponse> {
  http_server::requests_total("surprise_me").inc();
  let mut rng = rand::thread_rng();
  let cats = (0..100).map(|_| surprise(&mut rng)).collect();
  http_server::requests_success_total("surprise_me").inc();
  Json(SurpriseMeResponse {
    base: CodeMessage::ok(),
    cats,
  })
}
