use community_backend::{
    common::soft_delete_owned,
    routes::{
        community::{Favorite, Feedback},
        user::WeChatUser,
        work::{
            Appointment, AppointmentStatus, Ticket, TicketReview, TicketStatus,
            is_assignable_worker,
        },
    },
};
use sqlx::{Executor, PgPool, postgres::PgPoolOptions};

mod common;

// 需要真实的 Postgres：未设置 DATABASE_URL 时跳过。
// 每个用例建一个独立 schema 跑迁移，互不影响
async fn test_pool() -> Option<PgPool> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping database test");
        return None;
    };

    let schema = format!("it_{}", uuid::Uuid::new_v4().simple());
    let admin = PgPool::connect(&url).await.unwrap();
    admin
        .execute(format!("CREATE SCHEMA {}", schema).as_str())
        .await
        .unwrap();

    let pool = PgPoolOptions::new()
        .max_connections(4)
        .after_connect(move |conn, _meta| {
            let sql = format!("SET search_path TO {}", schema);
            Box::pin(async move {
                conn.execute(sql.as_str()).await?;
                Ok(())
            })
        })
        .connect(&url)
        .await
        .unwrap();
    sqlx::migrate!().run(&pool).await.unwrap();
    Some(pool)
}

async fn new_user(pool: &PgPool, open_id: &str) -> i64 {
    sqlx::query_scalar("INSERT INTO wechat_users (open_id) VALUES ($1) RETURNING id")
        .bind(open_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn new_ticket(pool: &PgPool, user_id: i64) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO tickets (user_id, name, phone, description) \
         VALUES ($1, '李四', '13800138000', '水管漏水') RETURNING id",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn new_appointment(pool: &PgPool, user_id: i64) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO appointments (user_id, name, phone) VALUES ($1, '王五', '13800138000') \
         RETURNING id",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn messages_of(pool: &PgPool, user_id: i64) -> Vec<(String, String)> {
    sqlx::query_as("SELECT type, content FROM messages WHERE receiver_id = $1 ORDER BY id")
        .bind(user_id)
        .fetch_all(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn ticket_status_change_notifies_owner_once() {
    let Some(pool) = test_pool().await else { return };
    let config = common::config();
    let owner = new_user(&pool, "o-ticket-owner").await;
    let ticket = new_ticket(&pool, owner).await;

    let update = Ticket::staff_update(&pool, &config, ticket, Some(TicketStatus::Processing), None, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(update.owner_id, owner);
    assert_eq!(update.changed, Some(TicketStatus::Processing));
    assert_eq!(update.record.status, 1);
    assert_eq!(
        messages_of(&pool, owner).await,
        vec![("居民服务".to_string(), "您提交的居民服务 处理中。".to_string())]
    );

    // 状态没变：不再发消息，但回复照常写入
    let update = Ticket::staff_update(
        &pool,
        &config,
        ticket,
        Some(TicketStatus::Processing),
        Some("师傅下午上门".into()),
        None,
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(update.changed, None);
    assert_eq!(update.record.replay.as_deref(), Some("师傅下午上门"));
    assert_eq!(messages_of(&pool, owner).await.len(), 1);

    let update = Ticket::staff_update(&pool, &config, ticket, None, None, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(update.changed, None);
    assert_eq!(update.record.status, 1);
    assert_eq!(messages_of(&pool, owner).await.len(), 1);
}

#[tokio::test]
async fn ticket_assignment_records_worker_and_admin() {
    let Some(pool) = test_pool().await else { return };
    let config = common::config();
    let owner = new_user(&pool, "o-assign-owner").await;
    let worker = new_user(&pool, "o-assign-worker").await;
    let admin = new_user(&pool, "o-assign-admin").await;
    let ticket = new_ticket(&pool, owner).await;

    let update = Ticket::staff_update(&pool, &config, ticket, None, None, Some((worker, admin)))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(update.record.worker, Some(worker));
    assert_eq!(update.record.admin, Some(admin));
    assert!(messages_of(&pool, owner).await.is_empty());
}

#[tokio::test]
async fn only_staff_can_be_assigned() {
    let Some(pool) = test_pool().await else { return };
    let resident = new_user(&pool, "o-resident").await;
    let worker = new_user(&pool, "o-worker").await;
    sqlx::query("UPDATE wechat_users SET role = 1 WHERE id = $1")
        .bind(worker)
        .execute(&pool)
        .await
        .unwrap();

    assert!(!is_assignable_worker(&pool, resident).await.unwrap());
    assert!(is_assignable_worker(&pool, worker).await.unwrap());
    assert!(!is_assignable_worker(&pool, 9999).await.unwrap());

    sqlx::query("UPDATE wechat_users SET is_deleted = TRUE WHERE id = $1")
        .bind(worker)
        .execute(&pool)
        .await
        .unwrap();
    assert!(!is_assignable_worker(&pool, worker).await.unwrap());
}

#[tokio::test]
async fn appointment_status_change_notifies_owner_once() {
    let Some(pool) = test_pool().await else { return };
    let owner = new_user(&pool, "o-appointment-owner").await;
    let appointment = new_appointment(&pool, owner).await;

    // 待审核 -> 待审核 不算变更
    let update = Appointment::staff_update(&pool, appointment, Some(AppointmentStatus::Pending), None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(update.changed, None);
    assert!(messages_of(&pool, owner).await.is_empty());

    let update = Appointment::staff_update(
        &pool,
        appointment,
        Some(AppointmentStatus::Approved),
        Some("请按时到场".into()),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(update.changed, Some(AppointmentStatus::Approved));
    assert_eq!(update.record.status, 1);
    assert_eq!(update.record.reply.as_deref(), Some("请按时到场"));
    assert_eq!(
        messages_of(&pool, owner).await,
        vec![("预约管理".to_string(), "您提交的服务预约 已通过。".to_string())]
    );
}

#[tokio::test]
async fn staff_update_of_missing_record_is_none() {
    let Some(pool) = test_pool().await else { return };
    let config = common::config();
    let owner = new_user(&pool, "o-missing").await;
    let ticket = new_ticket(&pool, owner).await;
    sqlx::query("UPDATE tickets SET is_deleted = TRUE WHERE id = $1")
        .bind(ticket)
        .execute(&pool)
        .await
        .unwrap();

    let update = Ticket::staff_update(&pool, &config, ticket, Some(TicketStatus::Done), None, None)
        .await
        .unwrap();
    assert!(update.is_none());
    let update = Appointment::staff_update(&pool, 9999, Some(AppointmentStatus::Approved), None)
        .await
        .unwrap();
    assert!(update.is_none());
    assert!(messages_of(&pool, owner).await.is_empty());
}

#[tokio::test]
async fn records_of_other_users_are_invisible() {
    let Some(pool) = test_pool().await else { return };
    let config = common::config();
    let owner = new_user(&pool, "o-owner").await;
    let stranger = new_user(&pool, "o-stranger").await;

    let ticket = new_ticket(&pool, owner).await;
    assert!(Ticket::find_owned(&pool, &config, ticket, owner).await.unwrap().is_some());
    assert!(Ticket::find_owned(&pool, &config, ticket, stranger).await.unwrap().is_none());

    let appointment = new_appointment(&pool, owner).await;
    assert!(Appointment::find_owned(&pool, appointment, stranger).await.unwrap().is_none());

    let feedback = Feedback::create(&pool, owner, "路灯坏了").await.unwrap();
    assert!(Feedback::find_owned(&pool, feedback.id, stranger).await.unwrap().is_none());

    let favorite = Favorite::create(&pool, owner, "社区食堂").await.unwrap();
    assert!(Favorite::find_owned(&pool, favorite.id, stranger).await.unwrap().is_none());
    assert!(Favorite::update(&pool, favorite.id, stranger, "改掉").await.unwrap().is_none());
    assert!(!soft_delete_owned(&pool, "favorites", favorite.id, stranger).await.unwrap());

    let kept = Favorite::find_owned(&pool, favorite.id, owner).await.unwrap().unwrap();
    assert_eq!(kept.item, "社区食堂");
}

#[tokio::test]
async fn soft_deleted_rows_leave_lists() {
    let Some(pool) = test_pool().await else { return };
    let owner = new_user(&pool, "o-soft-delete").await;
    let first = Favorite::create(&pool, owner, "社区食堂").await.unwrap();
    Favorite::create(&pool, owner, "老年活动中心").await.unwrap();

    assert!(soft_delete_owned(&pool, "favorites", first.id, owner).await.unwrap());
    // 重复删除视为不存在
    assert!(!soft_delete_owned(&pool, "favorites", first.id, owner).await.unwrap());

    let items: Vec<String> = Favorite::list_by_user(&pool, owner)
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.item)
        .collect();
    assert_eq!(items, vec!["老年活动中心".to_string()]);
    assert!(Favorite::find_owned(&pool, first.id, owner).await.unwrap().is_none());

    let still_there: bool = sqlx::query_scalar("SELECT is_deleted FROM favorites WHERE id = $1")
        .bind(first.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(still_there);
}

#[tokio::test]
async fn ticket_review_is_one_per_ticket() {
    let Some(pool) = test_pool().await else { return };
    let owner = new_user(&pool, "o-review").await;
    let stranger = new_user(&pool, "o-review-stranger").await;
    let ticket = new_ticket(&pool, owner).await;

    let first = TicketReview::upsert(&pool, owner, ticket, Some("一般".into()), Some(3))
        .await
        .unwrap()
        .unwrap();
    let second = TicketReview::upsert(&pool, owner, ticket, Some("很及时".into()), Some(5))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(second.rating, Some(5));
    assert_eq!(second.comment.as_deref(), Some("很及时"));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ticket_reviews WHERE ticket_id = $1")
        .bind(ticket)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);

    // 不能评价别人的工单
    let foreign = TicketReview::upsert(&pool, stranger, ticket, None, Some(1))
        .await
        .unwrap();
    assert!(foreign.is_none());
}

#[tokio::test]
async fn login_registers_unknown_openid_once() {
    let Some(pool) = test_pool().await else { return };

    let (user, created) = WeChatUser::get_or_create(&pool, "oFresh000123456", None, None)
        .await
        .unwrap();
    assert!(created);
    assert_eq!(user.nickname, "微信用户123456");
    assert_eq!(user.role, 0);
    assert!(user.is_active);

    let (again, created) = WeChatUser::get_or_create(&pool, "oFresh000123456", Some("新名字"), None)
        .await
        .unwrap();
    assert!(!created);
    assert_eq!(again.id, user.id);
    assert_eq!(again.nickname, "微信用户123456");
}
