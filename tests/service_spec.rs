use speculate2::speculate;
use uuid::Uuid;
use work_rollup::db::Database;
use work_rollup::models::*;
use work_rollup::service::{RollupError, RollupService};

struct Child {
    status: WorkItemStatus,
    estimated_hours: Option<f64>,
    done_ratio: u8,
}

fn child(status: WorkItemStatus, estimated_hours: Option<f64>, done_ratio: u8) -> Child {
    Child {
        status,
        estimated_hours,
        done_ratio,
    }
}

fn create_parent_with_children(db: &Database, children: &[Child]) -> WorkItem {
    let parent = db
        .create_work_item(CreateWorkItemInput {
            parent_id: None,
            title: "Parent".to_string(),
            status: None,
            estimated_hours: None,
            done_ratio: None,
        })
        .expect("Failed to create parent");

    for (i, c) in children.iter().enumerate() {
        db.create_work_item(CreateWorkItemInput {
            parent_id: Some(parent.id),
            title: format!("Child {}", i),
            status: Some(c.status),
            estimated_hours: c.estimated_hours,
            done_ratio: Some(c.done_ratio),
        })
        .expect("Failed to create child");
    }

    parent
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
        let service = RollupService::new(db.clone());
    }

    describe "recompute" {
        describe "with no estimated hours and no progress" {
            it "stores zero progress and no estimate" {
                use WorkItemStatus::Open;
                let parent = create_parent_with_children(&db, &[
                    child(Open, None, 0),
                    child(Open, None, 0),
                    child(Open, None, 0),
                ]);

                let updated = service.recompute(parent.id).expect("Recompute failed");

                assert_eq!(updated.done_ratio, 0);
                assert_eq!(updated.estimated_hours, None);
            }
        }

        describe "with 1 out of 3 tasks estimated and 2 out of 3 tasks done" {
            it "stores the weighted ratio and the estimate sum" {
                use WorkItemStatus::{Closed, Open};
                let parent = create_parent_with_children(&db, &[
                    child(Open, Some(0.0), 0),
                    child(Closed, Some(2.0), 0),
                    child(Closed, Some(0.0), 0),
                ]);

                let updated = service.recompute(parent.id).expect("Recompute failed");

                assert_eq!(updated.done_ratio, 67); // 66.67 rounded
                assert_eq!(updated.estimated_hours, Some(2.0));
            }

            it "handles mixed absent and zero estimates" {
                use WorkItemStatus::{Closed, Open};
                let parent = create_parent_with_children(&db, &[
                    child(Open, None, 0),
                    child(Closed, Some(2.0), 0),
                    child(Closed, Some(0.0), 0),
                ]);

                let updated = service.recompute(parent.id).expect("Recompute failed");

                assert_eq!(updated.done_ratio, 67); // 66.67 rounded
                assert_eq!(updated.estimated_hours, Some(2.0));
            }
        }

        describe "with no estimated hours and 1.5 of the tasks done" {
            it "stores the unweighted average" {
                use WorkItemStatus::Open;
                let parent = create_parent_with_children(&db, &[
                    child(Open, None, 0),
                    child(Open, None, 50),
                    child(Open, None, 100),
                ]);

                let updated = service.recompute(parent.id).expect("Recompute failed");

                assert_eq!(updated.done_ratio, 50);
                assert_eq!(updated.estimated_hours, None);
            }
        }

        describe "with estimated hours being 1, 2 and 5" {
            it "weighs progress by estimate" {
                use WorkItemStatus::Open;
                let parent = create_parent_with_children(&db, &[
                    child(Open, Some(1.0), 0),
                    child(Open, Some(2.0), 100),
                    child(Open, Some(5.0), 100),
                ]);

                let updated = service.recompute(parent.id).expect("Recompute failed");

                assert_eq!(updated.done_ratio, 88); // 87.5 rounded
                assert_eq!(updated.estimated_hours, Some(8.0));
            }

            it "treats closed tasks as fully done" {
                use WorkItemStatus::{Closed, Open};
                let parent = create_parent_with_children(&db, &[
                    child(Open, Some(1.0), 0),
                    child(Closed, Some(2.0), 0),
                    child(Closed, Some(5.0), 0),
                ]);

                let updated = service.recompute(parent.id).expect("Recompute failed");

                assert_eq!(updated.done_ratio, 88); // 87.5 rounded
                assert_eq!(updated.estimated_hours, Some(8.0));
            }
        }

        describe "with everything playing together" {
            it "combines closed overrides with substituted weights" {
                use WorkItemStatus::{Closed, Open};
                let parent = create_parent_with_children(&db, &[
                    child(Open, Some(0.0), 0),
                    child(Open, Some(3.0), 0),
                    child(Closed, None, 0),
                    child(Open, Some(7.0), 50),
                ]);

                let updated = service.recompute(parent.id).expect("Recompute failed");

                assert_eq!(updated.done_ratio, 43); // 42.5 rounded
                assert_eq!(updated.estimated_hours, Some(10.0));
            }
        }

        describe "with no children" {
            it "resets the derived fields" {
                let parent = db.create_work_item(CreateWorkItemInput {
                    parent_id: None,
                    title: "Childless".to_string(),
                    status: None,
                    estimated_hours: Some(9.0),
                    done_ratio: Some(75),
                }).expect("Failed to create parent");

                let updated = service.recompute(parent.id).expect("Recompute failed");

                assert_eq!(updated.done_ratio, 0);
                assert_eq!(updated.estimated_hours, None);
            }
        }

        describe "repeated over an unchanged tree" {
            it "converges to the same stored values" {
                use WorkItemStatus::{Closed, Open};
                let parent = create_parent_with_children(&db, &[
                    child(Open, Some(1.0), 50),
                    child(Closed, Some(5.0), 0),
                ]);

                let first = service.recompute(parent.id).expect("Recompute failed");
                let second = service.recompute(parent.id).expect("Recompute failed");

                assert_eq!(first.done_ratio, second.done_ratio);
                assert_eq!(first.estimated_hours, second.estimated_hours);
            }
        }

        describe "for a missing item" {
            it "reports NotFound" {
                let missing = Uuid::new_v4();
                let result = service.recompute(missing);

                assert!(matches!(result, Err(RollupError::NotFound(id)) if id == missing));
            }
        }
    }

    describe "recompute_ancestors" {
        it "propagates derived values up the chain" {
            use WorkItemStatus::{Closed, Open};

            let root = db.create_work_item(CreateWorkItemInput {
                parent_id: None,
                title: "Epic".to_string(),
                status: None,
                estimated_hours: None,
                done_ratio: None,
            }).expect("Failed to create root");

            let mid = db.create_work_item(CreateWorkItemInput {
                parent_id: Some(root.id),
                title: "Story".to_string(),
                status: None,
                estimated_hours: None,
                done_ratio: None,
            }).expect("Failed to create mid");

            let leaf = db.create_work_item(CreateWorkItemInput {
                parent_id: Some(mid.id),
                title: "Task".to_string(),
                status: Some(Closed),
                estimated_hours: Some(4.0),
                done_ratio: Some(0),
            }).expect("Failed to create leaf");

            db.create_work_item(CreateWorkItemInput {
                parent_id: Some(mid.id),
                title: "Task 2".to_string(),
                status: Some(Open),
                estimated_hours: Some(4.0),
                done_ratio: Some(50),
            }).expect("Failed to create leaf");

            let updated = service.recompute_ancestors(leaf.id).expect("Recompute failed");

            // Nearest ancestor first
            assert_eq!(updated.len(), 2);
            assert_eq!(updated[0].id, mid.id);
            assert_eq!(updated[1].id, root.id);

            // mid: (1.0 * 4 + 0.5 * 4) / 8 = 75%
            assert_eq!(updated[0].done_ratio, 75);
            assert_eq!(updated[0].estimated_hours, Some(8.0));

            // root inherits from mid's freshly stored values
            assert_eq!(updated[1].done_ratio, 75);
            assert_eq!(updated[1].estimated_hours, Some(8.0));
        }

        it "does nothing for a root item" {
            let root = db.create_work_item(CreateWorkItemInput {
                parent_id: None,
                title: "Root".to_string(),
                status: None,
                estimated_hours: None,
                done_ratio: None,
            }).expect("Failed to create root");

            let updated = service.recompute_ancestors(root.id).expect("Recompute failed");
            assert!(updated.is_empty());
        }

        it "reports NotFound for a missing item" {
            let result = service.recompute_ancestors(Uuid::new_v4());
            assert!(matches!(result, Err(RollupError::NotFound(_))));
        }
    }
}
