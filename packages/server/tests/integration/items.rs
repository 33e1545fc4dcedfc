use sea_orm::ConnectionTrait;
use serde_json::json;

use crate::common::{TEST_MAX_MODEL_BYTES, TestApp, part, routes};

mod upload {
    use super::*;

    #[tokio::test]
    async fn owner_can_upload_a_model_with_both_files() {
        let app = TestApp::spawn().await;
        let token = app.register_user("alice").await;

        let res = app.upload_item(&token, "Lounge chair", true).await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["title"], "Lounge chair");
        assert_eq!(res.body["category"], "furniture");
        assert_eq!(res.body["isPublic"], true);

        let model_url = res.body["modelUrl"].as_str().unwrap();
        let image = res.body["image"].as_str().unwrap();
        assert!(model_url.starts_with("/uploads/models/model-"));
        assert!(model_url.ends_with(".glb"));
        assert!(image.starts_with("/uploads/images/image-"));

        assert_eq!(app.stored_files("models"), 1);
        assert_eq!(app.stored_files("images"), 1);
    }

    #[tokio::test]
    async fn upload_requires_authentication() {
        let app = TestApp::spawn().await;

        let res = app
            .client
            .post(format!("http://{}{}", app.addr, routes::ITEMS))
            .multipart(app.item_form("Chair", true))
            .send()
            .await
            .unwrap();

        assert_eq!(res.status().as_u16(), 401);
    }

    #[tokio::test]
    async fn disallowed_model_extension_is_rejected_without_orphans() {
        let app = TestApp::spawn().await;
        let token = app.register_user("alice").await;

        let res = app
            .upload_item_with_files(
                &token,
                "Trojan",
                true,
                ("scene.exe", b"MZ".to_vec(), "application/octet-stream"),
                ("preview.png", b"png".to_vec(), "image/png"),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        // Neither file survives a rejected upload.
        assert_eq!(app.stored_files("models"), 0);
        assert_eq!(app.stored_files("images"), 0);
    }

    #[tokio::test]
    async fn non_image_preview_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.register_user("alice").await;

        let res = app
            .upload_item_with_files(
                &token,
                "Chair",
                true,
                ("scene.glb", b"glb".to_vec(), "model/gltf-binary"),
                ("preview.html", b"<html>".to_vec(), "text/html"),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert_eq!(app.stored_files("models"), 0);
        assert_eq!(app.stored_files("images"), 0);
    }

    #[tokio::test]
    async fn missing_files_or_fields_are_rejected_without_orphans() {
        let app = TestApp::spawn().await;
        let token = app.register_user("alice").await;

        // Metadata only, no files.
        let res = app.send_multipart(app.item_form("Chair", true), &token).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");

        // Files but no title.
        let form = reqwest::multipart::Form::new()
            .text("description", "short")
            .text("description_big", "long")
            .text("category", "furniture")
            .part("model", part(("a.glb", b"glb".to_vec(), "model/gltf-binary")))
            .part("image", part(("a.png", b"png".to_vec(), "image/png")));
        let res = app.send_multipart(form, &token).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");

        assert_eq!(app.stored_files("models"), 0);
        assert_eq!(app.stored_files("images"), 0);
    }

    #[tokio::test]
    async fn unknown_category_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.register_user("alice").await;

        let form = reqwest::multipart::Form::new()
            .text("title", "Chair")
            .text("description", "short")
            .text("description_big", "long")
            .text("category", "weapons")
            .part("model", part(("a.glb", b"glb".to_vec(), "model/gltf-binary")))
            .part("image", part(("a.png", b"png".to_vec(), "image/png")));
        let res = app.send_multipart(form, &token).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn oversized_model_file_is_rejected_without_orphans() {
        let app = TestApp::spawn().await;
        let token = app.register_user("alice").await;

        let oversized = vec![0u8; (TEST_MAX_MODEL_BYTES + 1) as usize];
        let res = app
            .upload_item_with_files(
                &token,
                "Huge",
                true,
                ("huge.glb", oversized, "model/gltf-binary"),
                ("preview.png", b"png".to_vec(), "image/png"),
            )
            .await;

        assert_eq!(res.status, 413, "{}", res.text);
        assert_eq!(res.body["code"], "PAYLOAD_TOO_LARGE");
        assert_eq!(app.stored_files("models"), 0);
        assert_eq!(app.stored_files("images"), 0);
    }
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn public_listing_excludes_private_items() {
        let app = TestApp::spawn().await;
        let token = app.register_user("alice").await;

        app.upload_item(&token, "Public chair", true).await;
        app.upload_item(&token, "Private chair", false).await;

        let res = app.get(routes::ITEMS).await;

        assert_eq!(res.status, 200);
        let items = res.body.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["title"], "Public chair");
    }

    #[tokio::test]
    async fn public_listing_is_newest_first() {
        let app = TestApp::spawn().await;
        let token = app.register_user("alice").await;

        app.upload_item(&token, "First", true).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        app.upload_item(&token, "Second", true).await;

        let res = app.get(routes::ITEMS).await;
        let items = res.body.as_array().unwrap();

        assert_eq!(items[0]["title"], "Second");
        assert_eq!(items[1]["title"], "First");
    }

    #[tokio::test]
    async fn public_listing_with_owners_resolves_usernames() {
        let app = TestApp::spawn().await;
        let token = app.register_user("alice").await;
        app.upload_item(&token, "Chair", true).await;

        let res = app.get(routes::ITEMS_PUBLIC).await;

        assert_eq!(res.status, 200);
        let items = res.body.as_array().unwrap();
        assert_eq!(items[0]["user"], "alice");
    }

    #[tokio::test]
    async fn missing_owner_falls_back_to_unknown() {
        let app = TestApp::spawn().await;
        let token = app.register_user("alice").await;
        app.upload_item(&token, "Orphan chair", true).await;

        // The schema's FK would veto this delete; turn enforcement off for
        // the one statement that constructs the orphaned-item state. All
        // three statements run as one batch so they share a connection.
        app.db
            .execute_unprepared(
                "PRAGMA foreign_keys = OFF; \
                 DELETE FROM \"user\" WHERE username = 'alice'; \
                 PRAGMA foreign_keys = ON;",
            )
            .await
            .unwrap();

        let res = app.get(routes::ITEMS_PUBLIC).await;
        let items = res.body.as_array().unwrap();

        assert_eq!(items[0]["user"], "unknown");
    }

    #[tokio::test]
    async fn my_models_lists_only_the_callers_items() {
        let app = TestApp::spawn().await;
        let alice = app.register_user("alice").await;
        let bob = app.register_user("bob").await;

        app.upload_item(&alice, "Alice private", false).await;
        app.upload_item(&bob, "Bob public", true).await;

        let res = app.get_with_token(routes::MY_MODELS, &alice).await;

        assert_eq!(res.status, 200);
        let items = res.body.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["title"], "Alice private");
    }

    #[tokio::test]
    async fn my_models_requires_authentication() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::MY_MODELS).await;

        assert_eq!(res.status, 401);
    }

    #[tokio::test]
    async fn get_by_id_returns_the_item_or_404() {
        let app = TestApp::spawn().await;
        let token = app.register_user("alice").await;
        let created = app.upload_item(&token, "Chair", false).await;
        let id = created.body["id"].as_i64().unwrap();

        let found = app.get(&routes::item(id)).await;
        assert_eq!(found.status, 200);
        assert_eq!(found.body["title"], "Chair");

        let missing = app.get(&routes::item(999_999)).await;
        assert_eq!(missing.status, 404);
        assert_eq!(missing.body["code"], "NOT_FOUND");
    }
}

mod download {
    use super::*;

    #[tokio::test]
    async fn model_file_streams_as_an_attachment() {
        let app = TestApp::spawn().await;
        let token = app.register_user("alice").await;
        let created = app.upload_item(&token, "Chair", true).await;
        let id = created.body["id"].as_i64().unwrap();
        let stored_name = created.body["modelUrl"]
            .as_str()
            .unwrap()
            .rsplit('/')
            .next()
            .unwrap()
            .to_string();

        let res = app
            .client
            .get(format!("http://{}{}", app.addr, routes::item_model(id)))
            .send()
            .await
            .unwrap();

        assert_eq!(res.status().as_u16(), 200);
        let disposition = res
            .headers()
            .get("content-disposition")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert_eq!(
            disposition,
            format!("attachment; filename=\"{stored_name}\"")
        );
        let body = res.bytes().await.unwrap();
        assert_eq!(&body[..], b"glTF-binary-test-data");
    }

    #[tokio::test]
    async fn missing_backing_file_is_404() {
        let app = TestApp::spawn().await;
        let token = app.register_user("alice").await;
        let created = app.upload_item(&token, "Chair", true).await;
        let id = created.body["id"].as_i64().unwrap();

        // Remove the file behind the metadata record.
        let stored_name = created.body["modelUrl"]
            .as_str()
            .unwrap()
            .rsplit('/')
            .next()
            .unwrap()
            .to_string();
        std::fs::remove_file(app.uploads_dir.join("models").join(stored_name)).unwrap();

        let res = app.get(&routes::item_model(id)).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod update {
    use super::*;

    #[tokio::test]
    async fn owner_can_update_allow_listed_fields() {
        let app = TestApp::spawn().await;
        let token = app.register_user("alice").await;
        let created = app.upload_item(&token, "Chair", false).await;
        let id = created.body["id"].as_i64().unwrap();

        let res = app
            .put_with_token(
                &routes::item(id),
                &json!({"title": "Armchair", "category": "other", "isPublic": true}),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["title"], "Armchair");
        assert_eq!(res.body["category"], "other");
        assert_eq!(res.body["isPublic"], true);
        // Untouched fields survive.
        assert_eq!(res.body["description"], "A short description");
    }

    #[tokio::test]
    async fn fields_outside_the_allow_list_are_ignored() {
        let app = TestApp::spawn().await;
        let token = app.register_user("alice").await;
        let created = app.upload_item(&token, "Chair", false).await;
        let id = created.body["id"].as_i64().unwrap();
        let owner = created.body["user"].clone();
        let model_url = created.body["modelUrl"].clone();

        let res = app
            .put_with_token(
                &routes::item(id),
                &json!({
                    "title": "Renamed",
                    "user": 999_999,
                    "modelUrl": "/etc/passwd",
                    "createdAt": "1970-01-01T00:00:00Z",
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["title"], "Renamed");
        assert_eq!(res.body["user"], owner);
        assert_eq!(res.body["modelUrl"], model_url);
    }

    #[tokio::test]
    async fn non_owner_cannot_update() {
        let app = TestApp::spawn().await;
        let alice = app.register_user("alice").await;
        let bob = app.register_user("bob").await;
        let created = app.upload_item(&alice, "Chair", true).await;
        let id = created.body["id"].as_i64().unwrap();

        let res = app
            .put_with_token(&routes::item(id), &json!({"title": "Stolen"}), &bob)
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "FORBIDDEN");

        // Unchanged.
        let after = app.get(&routes::item(id)).await;
        assert_eq!(after.body["title"], "Chair");
    }

    #[tokio::test]
    async fn invalid_patches_are_rejected() {
        let app = TestApp::spawn().await;
        let token = app.register_user("alice").await;
        let created = app.upload_item(&token, "Chair", true).await;
        let id = created.body["id"].as_i64().unwrap();

        let empty_title = app
            .put_with_token(&routes::item(id), &json!({"title": "   "}), &token)
            .await;
        assert_eq!(empty_title.status, 400);
        assert_eq!(empty_title.body["code"], "VALIDATION_ERROR");

        let bad_category = app
            .put_with_token(&routes::item(id), &json!({"category": "weapons"}), &token)
            .await;
        assert_eq!(bad_category.status, 400);
        assert_eq!(bad_category.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn missing_item_takes_precedence_over_an_invalid_patch() {
        let app = TestApp::spawn().await;
        let token = app.register_user("alice").await;

        let res = app
            .put_with_token(&routes::item(999_999), &json!({"title": "   "}), &token)
            .await;

        assert_eq!(res.status, 404, "{}", res.text);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn ownership_takes_precedence_over_an_invalid_patch() {
        let app = TestApp::spawn().await;
        let alice = app.register_user("alice").await;
        let bob = app.register_user("bob").await;
        let created = app.upload_item(&alice, "Chair", true).await;
        let id = created.body["id"].as_i64().unwrap();

        let res = app
            .put_with_token(&routes::item(id), &json!({"title": "   "}), &bob)
            .await;

        assert_eq!(res.status, 403, "{}", res.text);
        assert_eq!(res.body["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn unknown_category_still_reaches_404_and_403_first() {
        let app = TestApp::spawn().await;
        let alice = app.register_user("alice").await;
        let bob = app.register_user("bob").await;
        let created = app.upload_item(&alice, "Chair", true).await;
        let id = created.body["id"].as_i64().unwrap();

        let missing = app
            .put_with_token(&routes::item(999_999), &json!({"category": "weapons"}), &alice)
            .await;
        assert_eq!(missing.status, 404);

        let foreign = app
            .put_with_token(&routes::item(id), &json!({"category": "weapons"}), &bob)
            .await;
        assert_eq!(foreign.status, 403);
    }

    #[tokio::test]
    async fn updating_a_missing_item_is_404() {
        let app = TestApp::spawn().await;
        let token = app.register_user("alice").await;

        let res = app
            .put_with_token(&routes::item(999_999), &json!({"title": "X"}), &token)
            .await;

        assert_eq!(res.status, 404);
    }
}

mod delete {
    use super::*;

    #[tokio::test]
    async fn owner_delete_removes_record_and_files() {
        let app = TestApp::spawn().await;
        let token = app.register_user("alice").await;
        let created = app.upload_item(&token, "Chair", true).await;
        let id = created.body["id"].as_i64().unwrap();
        assert_eq!(app.stored_files("models"), 1);
        assert_eq!(app.stored_files("images"), 1);

        let res = app.delete_with_token(&routes::item(id), &token).await;
        assert_eq!(res.status, 200, "{}", res.text);

        assert_eq!(app.get(&routes::item(id)).await.status, 404);
        assert_eq!(app.stored_files("models"), 0);
        assert_eq!(app.stored_files("images"), 0);
    }

    #[tokio::test]
    async fn second_delete_of_the_same_item_is_404() {
        let app = TestApp::spawn().await;
        let token = app.register_user("alice").await;
        let created = app.upload_item(&token, "Chair", true).await;
        let id = created.body["id"].as_i64().unwrap();

        assert_eq!(app.delete_with_token(&routes::item(id), &token).await.status, 200);

        let second = app.delete_with_token(&routes::item(id), &token).await;
        assert_eq!(second.status, 404);
        assert_eq!(second.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn delete_succeeds_even_when_files_are_already_gone() {
        let app = TestApp::spawn().await;
        let token = app.register_user("alice").await;
        let created = app.upload_item(&token, "Chair", true).await;
        let id = created.body["id"].as_i64().unwrap();

        std::fs::remove_dir_all(app.uploads_dir.join("models")).unwrap();
        std::fs::create_dir_all(app.uploads_dir.join("models")).unwrap();

        // File deletion is best-effort; the metadata record still goes away.
        let res = app.delete_with_token(&routes::item(id), &token).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(app.get(&routes::item(id)).await.status, 404);
    }

    #[tokio::test]
    async fn non_owner_cannot_delete() {
        let app = TestApp::spawn().await;
        let alice = app.register_user("alice").await;
        let bob = app.register_user("bob").await;
        let created = app.upload_item(&alice, "Chair", true).await;
        let id = created.body["id"].as_i64().unwrap();

        let res = app.delete_with_token(&routes::item(id), &bob).await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "FORBIDDEN");
        assert_eq!(app.get(&routes::item(id)).await.status, 200);
    }
}

mod end_to_end {
    use super::*;

    /// Full lifecycle: register, upload, browse, a failed foreign update,
    /// and owner deletion.
    #[tokio::test]
    async fn full_item_lifecycle() {
        let app = TestApp::spawn().await;

        let alice = app.register_user("alice").await;
        let created = app.upload_item(&alice, "Showpiece", true).await;
        assert_eq!(created.status, 201);
        let id = created.body["id"].as_i64().unwrap();

        let gallery = app.get(routes::ITEMS_PUBLIC).await;
        let items = gallery.body.as_array().unwrap();
        assert!(items.iter().any(|i| i["id"] == created.body["id"] && i["user"] == "alice"));

        let bob = app.register_user("bob").await;
        let foreign_update = app
            .put_with_token(&routes::item(id), &json!({"title": "Mine now"}), &bob)
            .await;
        assert_eq!(foreign_update.status, 403);

        let delete = app.delete_with_token(&routes::item(id), &alice).await;
        assert_eq!(delete.status, 200);

        assert_eq!(app.get(&routes::item(id)).await.status, 404);
    }
}
