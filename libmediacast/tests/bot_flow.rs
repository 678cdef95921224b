//! End-to-end flows over the scripted mock gateway: submissions arrive,
//! an admin configures the interval through the menu, and the scheduler
//! drains the queue into the broadcast channel.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::{sleep, Duration};

use libmediacast::admin::AdminController;
use libmediacast::dispatch::Dispatcher;
use libmediacast::gateway::mock::{MockGateway, SentPayload};
use libmediacast::gateway::{
    CallbackPress, ChatId, InboundMedia, InboundMessage, MessageGateway, Sender, Update,
};
use libmediacast::ingest::Ingestor;
use libmediacast::{AdminSet, Database, MediaKind, PostQueue, Publisher, Scheduler};

const ADMIN: i64 = 100;
const USER: i64 = 7;
const CHANNEL: &str = "@channel";

struct Bot {
    db: Database,
    queue: PostQueue,
    gateway: MockGateway,
    _shutdown: watch::Sender<bool>,
}

/// Wire the full bot against a scripted gateway and start its tasks.
async fn start_bot(script: Vec<Update>) -> Bot {
    // The pool's connect + migrate run on blocking threads; under the
    // test's paused clock tokio auto-advances past sqlx's acquire timeout
    // before the connection comes up, yielding PoolTimedOut. Bring the
    // database up in real time, then restore the paused clock the tests
    // rely on for deterministic scheduler timing.
    tokio::time::resume();
    let db = Database::new(":memory:").await.unwrap();
    tokio::time::pause();
    let queue = PostQueue::new(db.clone());
    let gateway = MockGateway::with_updates(script);
    let admins = AdminSet::new([ADMIN]);

    let publisher = Publisher::new(
        queue.clone(),
        db.clone(),
        Arc::new(gateway.clone()),
        ChatId::from(CHANNEL),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (scheduler, handle) = Scheduler::new(db.clone(), publisher, shutdown_rx.clone());
    tokio::spawn(scheduler.run());

    let admin = AdminController::new(
        db.clone(),
        queue.clone(),
        Arc::new(gateway.clone()),
        handle,
        admins.clone(),
    );
    let ingestor = Ingestor::new(db.clone(), queue.clone(), admins, "shared caption".to_string());
    let dispatcher = Dispatcher::new(Arc::new(gateway.clone()), ingestor, admin);
    tokio::spawn(dispatcher.run(shutdown_rx));

    Bot {
        db,
        queue,
        gateway,
        _shutdown: shutdown_tx,
    }
}

fn photo(chat_id: i64, file_ref: &str) -> Update {
    Update::Message(InboundMessage {
        from: Sender::bare(chat_id),
        text: None,
        media: Some(InboundMedia {
            kind: MediaKind::Photo,
            file_ref: file_ref.to_string(),
        }),
    })
}

fn text(chat_id: i64, content: &str) -> Update {
    Update::Message(InboundMessage {
        from: Sender::bare(chat_id),
        text: Some(content.to_string()),
        media: None,
    })
}

fn callback(chat_id: i64, data: &str) -> Update {
    Update::Callback(CallbackPress {
        id: format!("cb-{}", data),
        from: Sender::bare(chat_id),
        data: data.to_string(),
    })
}

fn channel_file_refs(gateway: &MockGateway) -> Vec<String> {
    gateway
        .sent_to(&ChatId::from(CHANNEL))
        .into_iter()
        .map(|message| match message.payload {
            SentPayload::Photo { file_ref, .. } => file_ref,
            SentPayload::Video { file_ref, .. } => file_ref,
            SentPayload::Text { text } => panic!("unexpected text in channel: {}", text),
        })
        .collect()
}

/// Poll, in one-second virtual steps, until the channel has received
/// `target` posts. Returns the virtual elapsed time at observation.
async fn wait_for_channel_posts(gateway: &MockGateway, target: usize, max: Duration) -> Duration {
    let start = tokio::time::Instant::now();
    while gateway.sent_to(&ChatId::from(CHANNEL)).len() < target {
        if start.elapsed() > max {
            panic!(
                "timed out after {:?} with {} of {} channel posts",
                max,
                gateway.sent_to(&ChatId::from(CHANNEL)).len(),
                target
            );
        }
        sleep(Duration::from_secs(1)).await;
    }
    start.elapsed()
}

#[tokio::test(start_paused = true)]
async fn submissions_then_interval_set_drains_queue_in_order() {
    let bot = start_bot(vec![
        photo(USER, "p1"),
        photo(USER, "p2"),
        text(ADMIN, "/start"),
        callback(ADMIN, "admin_menu"),
        callback(ADMIN, "set_interval"),
        text(ADMIN, "5"),
    ])
    .await;

    // Setting the interval publishes the queue head immediately.
    let first = wait_for_channel_posts(&bot.gateway, 1, Duration::from_secs(120)).await;
    assert!(first <= Duration::from_secs(60), "immediate publish was slow: {:?}", first);
    assert_eq!(channel_file_refs(&bot.gateway), vec!["p1"]);
    assert_eq!(
        bot.db.settings().await.unwrap().unwrap().interval_minutes,
        5
    );

    // The second post goes out one full interval after the first; the
    // wait restarts its clock at the first delivery, so this measures
    // the spacing.
    let gap = wait_for_channel_posts(&bot.gateway, 2, Duration::from_secs(600)).await;
    assert_eq!(channel_file_refs(&bot.gateway), vec!["p1", "p2"]);
    assert!(gap >= Duration::from_secs(290), "second fired early: {:?}", gap);
    assert!(gap <= Duration::from_secs(400), "second fired late: {:?}", gap);

    // Queue drained; later ticks deliver nothing.
    sleep(Duration::from_secs(900)).await;
    assert_eq!(channel_file_refs(&bot.gateway), vec!["p1", "p2"]);
    assert!(bot.queue.peek_oldest_unpublished().await.unwrap().is_none());

    // Both channel posts carry the fixed caption.
    for message in bot.gateway.sent_to(&ChatId::from(CHANNEL)) {
        match message.payload {
            SentPayload::Photo { caption, .. } => assert_eq!(caption, "shared caption"),
            other => panic!("unexpected payload {:?}", other),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn no_interval_means_no_delivery_ever() {
    let bot = start_bot(vec![
        photo(USER, "p1"),
        photo(USER, "p2"),
        photo(USER, "p3"),
    ])
    .await;

    // A long stretch of idle probes; the queue only grows.
    sleep(Duration::from_secs(3600)).await;
    assert!(channel_file_refs(&bot.gateway).is_empty());
    assert_eq!(bot.queue.list_unpublished(40).await.unwrap().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn admin_deletes_head_before_it_publishes() {
    let bot = start_bot(vec![photo(USER, "p1"), photo(USER, "p2")]).await;

    // Let the submissions land.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(60);
    loop {
        if bot.queue.list_unpublished(40).await.unwrap().len() == 2 {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "submissions never landed"
        );
        sleep(Duration::from_secs(1)).await;
    }
    let head = bot.queue.peek_oldest_unpublished().await.unwrap().unwrap();

    // Admin reviews the queue, deletes the head, then configures the
    // interval; the convenience publish delivers the survivor.
    bot.gateway.push_update(callback(ADMIN, "show_posts"));
    bot.gateway
        .push_update(callback(ADMIN, &format!("delete_{}", head.id)));
    bot.gateway.push_update(callback(ADMIN, "set_interval"));
    bot.gateway.push_update(text(ADMIN, "3"));

    wait_for_channel_posts(&bot.gateway, 1, Duration::from_secs(120)).await;

    // The review listing went to the admin with delete buttons.
    let review: Vec<_> = bot
        .gateway
        .sent_to(&ChatId::from(ADMIN))
        .into_iter()
        .filter(|m| m.keyboard.is_some())
        .collect();
    assert_eq!(review.len(), 2);

    // The surviving post is the one that reached the channel.
    assert_eq!(channel_file_refs(&bot.gateway), vec!["p2"]);
    assert!(bot.queue.peek_oldest_unpublished().await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn self_messages_never_feed_the_queue() {
    let probe = MockGateway::new();
    let self_id = probe.self_id();

    let bot = start_bot(vec![photo(self_id, "own-broadcast")]).await;

    sleep(Duration::from_secs(30)).await;
    assert!(bot.queue.list_unpublished(40).await.unwrap().is_empty());
    assert_eq!(bot.gateway.send_count(), 0);
}
